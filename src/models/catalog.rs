// Fixed service menu and brand lists partners choose from.
use crate::models::partner::{ServiceCategory, SubService};

pub const CAR_BRANDS: &[&str] = &[
    "Audi", "BMW", "Chevrolet", "Ford", "Hyundai", "Honda", "Jeep", "Kia", "Mahindra",
    "Morris Garages", "Nissan", "Renault", "Skoda", "Suzuki", "Tata Motors", "Toyota",
];

pub const BIKE_BRANDS: &[&str] = &[
    "Aprilia", "Hero", "Bajaj", "Hero Motocorp", "TVS", "Honda", "Yamaha", "Kawasaki",
    "Ducati", "Benelli", "BMW", "Royal Enfield", "HarleyDavidson", "BMW Motorrad",
];

/// Brands a non-premium garage may list.
pub const DEFAULT_FREE_BRANDS: i32 = 50;

const SERVICES: &[(&str, &[&str])] = &[
    (
        "General Maintenance",
        &[
            "Brake Pad Replacement",
            "Oil Change",
            "Car Wash",
            "Battery Replacement",
            "AC Service",
            "Full General Service",
        ],
    ),
    (
        "Brakes and Wheels",
        &[
            "Brake Pad Replacement",
            "Disc Polishing",
            "Wheel Alignment",
            "Wheel Balancing",
            "Tyre Rotation",
        ],
    ),
    (
        "Body & Paint",
        &["Dent Repair", "Full Car Painting", "Bumper Repair", "Scratch Removal"],
    ),
    (
        "Bike General Service",
        &[
            "Chain Cleaning & Lube",
            "Engine Oil Change",
            "Air Filter Cleaning",
            "Coolant Check",
            "Spark Plug Replacement",
        ],
    ),
    (
        "Bike Brakes & Tyres",
        &[
            "Brake Shoe Replacement",
            "Disc Pad Replacement",
            "Tyre Replacement",
            "Wheel Alignment",
        ],
    ),
    (
        "Bike Body & Electrical",
        &[
            "Body Polishing",
            "Seat Repair",
            "Headlight Repair",
            "Horn Replacement",
            "Battery Replacement",
        ],
    ),
];

/// The whole menu with nothing selected.
pub fn service_catalog() -> Vec<ServiceCategory> {
    SERVICES
        .iter()
        .map(|(category, names)| ServiceCategory {
            category_name: category.to_string(),
            sub_services: names
                .iter()
                .map(|name| SubService {
                    name: name.to_string(),
                    selected: false,
                })
                .collect(),
        })
        .collect()
}

pub fn is_catalog_service(category: &str, name: &str) -> bool {
    SERVICES
        .iter()
        .any(|(c, names)| *c == category && names.contains(&name))
}

/// The menu with a garage's picks ticked. Entries outside the menu are ignored.
pub fn merge_selection(picked: &[ServiceCategory]) -> Vec<ServiceCategory> {
    let is_picked = |category: &str, name: &str| {
        picked
            .iter()
            .filter(|c| c.category_name == category)
            .flat_map(|c| c.sub_services.iter())
            .any(|s| s.selected && s.name == name)
    };

    let mut menu = service_catalog();
    for category in menu.iter_mut() {
        for service in category.sub_services.iter_mut() {
            service.selected = is_picked(&category.category_name, &service.name);
        }
    }
    menu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup_is_per_category() {
        assert!(is_catalog_service("Body & Paint", "Dent Repair"));
        assert!(!is_catalog_service("Body & Paint", "Oil Change"));
        assert!(!is_catalog_service("Detailing", "Dent Repair"));
    }

    #[test]
    fn merge_ticks_only_picked_entries() {
        let picked = vec![ServiceCategory {
            category_name: "Brakes and Wheels".into(),
            sub_services: vec![
                SubService { name: "Wheel Alignment".into(), selected: true },
                SubService { name: "Tyre Rotation".into(), selected: false },
                SubService { name: "Nitrogen Fill".into(), selected: true },
            ],
        }];

        let menu = merge_selection(&picked);
        let selected: Vec<(&str, &str)> = menu
            .iter()
            .flat_map(|c| {
                c.sub_services
                    .iter()
                    .filter(|s| s.selected)
                    .map(move |s| (c.category_name.as_str(), s.name.as_str()))
            })
            .collect();
        assert_eq!(selected, vec![("Brakes and Wheels", "Wheel Alignment")]);
        assert_eq!(menu.len(), service_catalog().len());
    }
}

use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use rand::Rng;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::models::catalog::{self, BIKE_BRANDS, CAR_BRANDS, DEFAULT_FREE_BRANDS};

pub const GARAGE_ID_RANGE: std::ops::Range<i64> = 1_000_000..10_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleType {
    Car,
    Bike,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Car => "Car",
            VehicleType::Bike => "Bike",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brands {
    #[serde(default)]
    pub car_brands: Vec<String>,
    #[serde(default)]
    pub bike_brands: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubService {
    pub name: String,
    #[serde(default)]
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCategory {
    pub category_name: String,
    #[serde(default)]
    pub sub_services: Vec<SubService>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopPhoto {
    pub url: String,
}

/// GeoJSON point, `[longitude, latitude]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<f64>,
}

/// Identity check on the garage owner. Only the masked number is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kyc {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aadhaar_masked: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aadhaar_last4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<BsonDateTime>,
}

impl Kyc {
    pub fn aadhaar(number: &str, submitted_at: DateTime<Utc>) -> Self {
        let last4 = &number[number.len().saturating_sub(4)..];
        Kyc {
            kind: "Aadhar".to_string(),
            aadhaar_masked: Some(format!("XXXX-XXXX-{}", last4)),
            aadhaar_last4: Some(last4.to_string()),
            full_name: None,
            verified: false,
            submitted_at: Some(BsonDateTime::from_millis(submitted_at.timestamp_millis())),
        }
    }
}

fn default_free_brands() -> i32 {
    DEFAULT_FREE_BRANDS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garage_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default)]
    pub vehicle_types: Vec<VehicleType>,
    #[serde(default)]
    pub expertise: Vec<String>,
    #[serde(default)]
    pub services: Vec<ServiceCategory>,
    #[serde(default)]
    pub brands: Brands,
    #[serde(default)]
    pub shop_photos: Vec<ShopPhoto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_location: Option<GeoPoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kyc: Option<Kyc>,

    #[serde(default)]
    pub is_premium: bool,
    #[serde(default = "default_free_brands")]
    pub max_free_brands: i32,
    #[serde(default)]
    pub public_scans: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_public_scan: Option<BsonDateTime>,

    // Outstanding OTP challenge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_expires: Option<BsonDateTime>,

    #[serde(default)]
    pub is_verified: bool,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Partner {
    pub fn with_phone(phone: impl Into<String>) -> Self {
        let mut partner = Self::blank();
        partner.phone = Some(phone.into());
        partner
    }

    pub fn with_email(email: impl Into<String>) -> Self {
        let mut partner = Self::blank();
        partner.email = Some(email.into());
        partner
    }

    fn blank() -> Self {
        let now = Utc::now();
        Partner {
            _id: None,
            garage_id: None,
            phone: None,
            email: None,
            full_name: None,
            business_name: None,
            bio: None,
            experience: None,
            address: None,
            vehicle_types: Vec::new(),
            expertise: Vec::new(),
            services: Vec::new(),
            brands: Brands::default(),
            shop_photos: Vec::new(),
            shop_location: None,
            kyc: None,
            is_premium: false,
            max_free_brands: DEFAULT_FREE_BRANDS,
            public_scans: 0,
            last_public_scan: None,
            otp: None,
            otp_expires: None,
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn display_name(&self) -> &str {
        self.business_name
            .as_deref()
            .or(self.full_name.as_deref())
            .unwrap_or("Your Garage")
    }

    /// Names of the sub-services the garage has ticked.
    pub fn selected_services(&self) -> Vec<&str> {
        self.services
            .iter()
            .flat_map(|c| c.sub_services.iter())
            .filter(|s| s.selected)
            .map(|s| s.name.as_str())
            .collect()
    }

    pub fn all_brands(&self) -> Vec<&str> {
        self.brands
            .car_brands
            .iter()
            .chain(self.brands.bike_brands.iter())
            .map(String::as_str)
            .collect()
    }

    /// The full service menu with this garage's picks ticked.
    pub fn service_menu(&self) -> Vec<ServiceCategory> {
        catalog::merge_selection(&self.services)
    }

    /// Menu entries that are (or are not) picked, without empty categories.
    pub fn services_where(&self, selected: bool) -> Vec<ServiceCategory> {
        self.service_menu()
            .into_iter()
            .filter_map(|mut category| {
                category.sub_services.retain(|s| s.selected == selected);
                (!category.sub_services.is_empty()).then_some(category)
            })
            .collect()
    }

    /// `None` for premium garages, which have no cap.
    pub fn brand_limit(&self) -> Option<usize> {
        (!self.is_premium).then_some(self.max_free_brands.max(0) as usize)
    }

    pub fn public_profile_url(&self, base_url: &str) -> Option<String> {
        self.garage_id
            .map(|id| format!("{}/api/partners/profile/{}", base_url, id))
    }
}

/// Random 7-digit garage number; callers retry on collision.
pub fn random_garage_id() -> i64 {
    rand::thread_rng().gen_range(GARAGE_ID_RANGE)
}

pub fn parse_garage_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| GARAGE_ID_RANGE.contains(id))
        .ok_or_else(|| AppError::invalid_data(format!("Invalid garage id: {}", raw)))
}

/// What anyone scanning the garage QR code gets to see.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicGarage {
    pub id: Option<i64>,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub services: Vec<ServiceCategory>,
    pub brands: Brands,
    pub is_premium: bool,
    pub photos: Vec<ShopPhoto>,
    pub scan_count: i64,
}

impl From<&Partner> for PublicGarage {
    fn from(p: &Partner) -> Self {
        PublicGarage {
            id: p.garage_id,
            name: p.display_name().to_string(),
            phone: p.phone.clone(),
            address: p.address.clone(),
            services: p.services.clone(),
            brands: p.brands.clone(),
            is_premium: p.is_premium,
            photos: p.shop_photos.clone(),
            scan_count: p.public_scans,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerProfileResponse {
    pub id: String,
    pub garage_id: Option<i64>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub business_name: Option<String>,
    pub bio: Option<String>,
    pub experience: Option<i32>,
    pub address: Option<String>,
    pub vehicle_types: Vec<VehicleType>,
    pub expertise: Vec<String>,
    pub is_premium: bool,
    pub is_verified: bool,
    pub public_scans: i64,
    pub updated_at: String,
}

impl From<&Partner> for PartnerProfileResponse {
    fn from(p: &Partner) -> Self {
        PartnerProfileResponse {
            id: p._id.map(|id| id.to_hex()).unwrap_or_default(),
            garage_id: p.garage_id,
            phone: p.phone.clone(),
            email: p.email.clone(),
            full_name: p.full_name.clone(),
            business_name: p.business_name.clone(),
            bio: p.bio.clone(),
            experience: p.experience,
            address: p.address.clone(),
            vehicle_types: p.vehicle_types.clone(),
            expertise: p.expertise.clone(),
            is_premium: p.is_premium,
            is_verified: p.is_verified,
            public_scans: p.public_scans,
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

/// Typed partial update shared by the MongoDB and in-memory stores.
#[derive(Debug, Clone, Default)]
pub struct PartnerPatch {
    pub business_name: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub experience: Option<i32>,
    pub address: Option<String>,
    pub vehicle_types: Option<Vec<VehicleType>>,
    pub expertise: Option<Vec<String>>,
    pub services: Option<Vec<ServiceCategory>>,
    pub brands: Option<Brands>,
    pub kyc: Option<Kyc>,
}

fn to_bson_value<T: Serialize>(value: &T) -> Result<bson::Bson> {
    bson::to_bson(value).map_err(|e| AppError::service(format!("BSON conversion failed: {}", e)))
}

impl PartnerPatch {
    pub fn to_set_document(&self, now: DateTime<Utc>) -> Result<bson::Document> {
        let mut set = bson::doc! {
            "updatedAt": BsonDateTime::from_millis(now.timestamp_millis()),
        };
        if let Some(v) = &self.business_name {
            set.insert("businessName", v.as_str());
        }
        if let Some(v) = &self.full_name {
            set.insert("fullName", v.as_str());
        }
        if let Some(v) = &self.bio {
            set.insert("bio", v.as_str());
        }
        if let Some(v) = self.experience {
            set.insert("experience", v);
        }
        if let Some(v) = &self.address {
            set.insert("address", v.as_str());
        }
        if let Some(v) = &self.vehicle_types {
            set.insert("vehicleTypes", to_bson_value(v)?);
        }
        if let Some(v) = &self.expertise {
            set.insert("expertise", v.clone());
        }
        if let Some(v) = &self.services {
            set.insert("services", to_bson_value(v)?);
        }
        if let Some(v) = &self.brands {
            set.insert("brands", to_bson_value(v)?);
        }
        if let Some(v) = &self.kyc {
            set.insert("kyc", to_bson_value(v)?);
        }
        Ok(set)
    }

    pub fn apply(&self, partner: &mut Partner, now: DateTime<Utc>) {
        if let Some(v) = &self.business_name {
            partner.business_name = Some(v.clone());
        }
        if let Some(v) = &self.full_name {
            partner.full_name = Some(v.clone());
        }
        if let Some(v) = &self.bio {
            partner.bio = Some(v.clone());
        }
        if let Some(v) = self.experience {
            partner.experience = Some(v);
        }
        if let Some(v) = &self.address {
            partner.address = Some(v.clone());
        }
        if let Some(v) = &self.vehicle_types {
            partner.vehicle_types = v.clone();
        }
        if let Some(v) = &self.expertise {
            partner.expertise = v.clone();
        }
        if let Some(v) = &self.services {
            partner.services = v.clone();
        }
        if let Some(v) = &self.brands {
            partner.brands = v.clone();
        }
        if let Some(v) = &self.kyc {
            partner.kyc = Some(v.clone());
        }
        partner.updated_at = now;
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePartnerProfile {
    #[validate(length(min = 2, max = 100, message = "Business name must be between 2 and 100 characters"))]
    pub business_name: Option<String>,
    #[validate(length(min = 2, max = 50, message = "Full name must be between 2 and 50 characters"))]
    pub full_name: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    #[validate(range(min = 0, max = 80))]
    pub experience: Option<i32>,
    #[validate(length(min = 10, max = 200, message = "Address must be between 10 and 200 characters"))]
    pub address: Option<String>,
    pub vehicle_types: Option<Vec<VehicleType>>,
    pub expertise: Option<Vec<String>>,
}

impl UpdatePartnerProfile {
    pub fn into_patch(self) -> Result<PartnerPatch> {
        let trim = |v: Option<String>| v.map(|v| v.trim().to_string());

        if matches!(&self.vehicle_types, Some(types) if types.is_empty()) {
            return Err(AppError::invalid_data("At least one vehicle type is required"));
        }

        let patch = PartnerPatch {
            business_name: trim(self.business_name),
            full_name: trim(self.full_name),
            bio: trim(self.bio),
            experience: self.experience,
            address: trim(self.address),
            vehicle_types: self.vehicle_types,
            expertise: self.expertise.map(|items| {
                items
                    .iter()
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty())
                    .collect()
            }),
            ..PartnerPatch::default()
        };

        let nothing_set = patch.business_name.is_none()
            && patch.full_name.is_none()
            && patch.bio.is_none()
            && patch.experience.is_none()
            && patch.address.is_none()
            && patch.vehicle_types.is_none()
            && patch.expertise.is_none();
        if nothing_set {
            return Err(AppError::invalid_data("No profile fields to update"));
        }
        Ok(patch)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePartnerServices {
    pub services: Vec<ServiceCategory>,
}

impl UpdatePartnerServices {
    /// Keeps only ticked entries and rejects anything not on the menu.
    pub fn into_selection(self) -> Result<Vec<ServiceCategory>> {
        let mut selection = Vec::new();
        for category in self.services {
            let name = category.category_name.trim().to_string();
            let mut picked = Vec::new();
            for service in category.sub_services.into_iter().filter(|s| s.selected) {
                let service_name = service.name.trim();
                if !catalog::is_catalog_service(&name, service_name) {
                    return Err(AppError::invalid_data(format!(
                        "Unknown service '{}' in '{}'",
                        service_name, name
                    )));
                }
                picked.push(SubService {
                    name: service_name.to_string(),
                    selected: true,
                });
            }
            if !picked.is_empty() {
                selection.push(ServiceCategory {
                    category_name: name,
                    sub_services: picked,
                });
            }
        }
        Ok(selection)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePartnerBrands {
    pub car_brands: Option<Vec<String>>,
    pub bike_brands: Option<Vec<String>>,
}

impl UpdatePartnerBrands {
    /// Lists that are left out keep their current value.
    pub fn merge_into(self, current: &Brands, limit: Option<usize>) -> Result<Brands> {
        if self.car_brands.is_none() && self.bike_brands.is_none() {
            return Err(AppError::invalid_data("At least one brand selection is required"));
        }

        let check = |list: Vec<String>, allowed: &[&str], kind: &str| -> Result<Vec<String>> {
            let mut cleaned: Vec<String> = Vec::new();
            for brand in list.iter().map(|b| b.trim()) {
                if !allowed.contains(&brand) {
                    return Err(AppError::invalid_data(format!("Invalid {} brand selected: {}", kind, brand)));
                }
                if !cleaned.iter().any(|b| b == brand) {
                    cleaned.push(brand.to_string());
                }
            }
            Ok(cleaned)
        };

        let brands = Brands {
            car_brands: match self.car_brands {
                Some(list) => check(list, CAR_BRANDS, "car")?,
                None => current.car_brands.clone(),
            },
            bike_brands: match self.bike_brands {
                Some(list) => check(list, BIKE_BRANDS, "bike")?,
                None => current.bike_brands.clone(),
            },
        };

        if let Some(limit) = limit {
            let total = brands.car_brands.len() + brands.bike_brands.len();
            if total > limit {
                return Err(AppError::invalid_data(format!(
                    "Free plan allows up to {} brands, {} selected",
                    limit, total
                )));
            }
        }
        Ok(brands)
    }
}

/// The number is checked by `digits()`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitKyc {
    pub aadhaar_number: String,
}

impl SubmitKyc {
    pub fn digits(&self) -> Result<&str> {
        let number = self.aadhaar_number.trim();
        if number.len() != 12 || !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::invalid_data("Aadhaar number must be 12 digits"));
        }
        Ok(number)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KycStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aadhaar_masked: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl From<&Partner> for KycStatus {
    fn from(p: &Partner) -> Self {
        match &p.kyc {
            None => KycStatus {
                status: "not_submitted",
                document_type: None,
                aadhaar_masked: None,
                full_name: None,
            },
            Some(kyc) => KycStatus {
                status: if kyc.verified { "verified" } else { "pending" },
                document_type: Some(kyc.kind.clone()),
                aadhaar_masked: kyc.aadhaar_masked.clone(),
                full_name: kyc.full_name.clone(),
            },
        }
    }
}

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Directory listing and search filters, read from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerQuery {
    pub query: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub expertise: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<i64>,
}

impl PartnerQuery {
    pub fn text(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    pub fn expertise(&self) -> Option<&str> {
        self.expertise.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }

    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn skip(&self) -> u64 {
        (self.page() - 1) * self.limit() as u64
    }

    /// Case-insensitive: `query` is a substring of a name, the address, an
    /// expertise or a service; `expertise` must equal one entry.
    pub fn matches(&self, partner: &Partner) -> bool {
        if let Some(kind) = self.vehicle_type {
            if !partner.vehicle_types.contains(&kind) {
                return false;
            }
        }
        if let Some(wanted) = self.expertise() {
            if !partner.expertise.iter().any(|e| e.eq_ignore_ascii_case(wanted)) {
                return false;
            }
        }
        let Some(text) = self.text() else {
            return true;
        };

        let needle = text.to_lowercase();
        let hit = |value: &str| value.to_lowercase().contains(&needle);
        partner.business_name.as_deref().is_some_and(hit)
            || partner.full_name.as_deref().is_some_and(hit)
            || partner.address.as_deref().is_some_and(hit)
            || partner.expertise.iter().any(|e| hit(e))
            || partner
                .services
                .iter()
                .flat_map(|c| c.sub_services.iter())
                .any(|s| hit(&s.name))
    }
}

//! Outbound message bodies and the public garage page.

use crate::models::lead::Lead;
use crate::models::partner::Partner;

const BRAND: &str = "Garages of India";

pub fn otp_message(code: &str, window_minutes: i64) -> String {
    format!(
        "Your {} verification code is {}. It expires in {} minutes. Do not share it with anyone.",
        BRAND, code, window_minutes
    )
}

pub fn quote_otp_message(user_name: &str, code: &str, window_minutes: i64) -> String {
    format!(
        "🔐 *Verify Garage Quote*\n\n\
         Hey *{}*,\n\
         Enter this OTP to confirm the quote shared by the garage:\n\n\
         👉 *{}*\n\n\
         *Valid for {} minutes.*",
        user_name, code, window_minutes
    )
}

pub fn lead_enquiry_to_partner(partner: &Partner, lead: &Lead) -> String {
    format!(
        "🚗 *New Quotation Request on {brand}!*\n\n\
         Hey *{garage}* 👋,\n\n\
         A customer has requested a quote.\n\n\
         📌 *Name:* {name}\n\
         📞 *Phone:* {phone}\n\
         🚘 *Vehicle:* {vehicle}\n\
         🛠 *Services:* {services}\n\
         💰 *Budget:* {budget}\n\
         📍 *Location:* {location}\n\n\
         Please respond with a quotation ASAP.\n\
         – *{brand} Team*",
        brand = BRAND,
        garage = partner.display_name(),
        name = lead.user_name,
        phone = lead.user_phone,
        vehicle = lead.vehicle.as_deref().unwrap_or("Not specified"),
        services = join_or_dash(&lead.services),
        budget = lead
            .budget
            .map(rupees)
            .unwrap_or_else(|| "Not specified".to_string()),
        location = lead.location.as_deref().unwrap_or("Not specified"),
    )
}

pub fn lead_ack_to_user(partner: &Partner, lead: &Lead) -> String {
    format!(
        "Hey *{}* 👋,\n\n\
         Your quote request has been sent to *{}*.\n\n\
         They will contact you shortly on *{}*.\n\n\
         Thanks for using *{}* 🚗✨",
        lead.user_name,
        partner.display_name(),
        lead.user_phone,
        BRAND
    )
}

pub fn quote_reply_message(lead: &Lead, amount: f64, message: Option<&str>, eta: Option<&str>) -> String {
    let mut body = format!(
        "🔧 *Garage Quote Sent!*\n\n\
         Dear {},\n\n\
         Your vehicle: *{}*\n\
         Services: {}\n\n\
         💰 *Quote:* {}\n\
         🕒 *Time:* {}\n\
         📍 *Location:* {}\n",
        lead.user_name,
        lead.vehicle.as_deref().unwrap_or("Not specified"),
        join_or_dash(&lead.services),
        rupees(amount),
        eta.unwrap_or("To be confirmed"),
        lead.location.as_deref().unwrap_or("Not specified"),
    );
    if let Some(note) = message.filter(|m| !m.trim().is_empty()) {
        body.push_str(&format!("\n📝 {}\n", note));
    }
    body.push_str(&format!("\nThank you for choosing *{}*!", BRAND));
    body
}

pub fn garage_enquiry_message(partner: &Partner, user_name: &str, user_phone: &str) -> String {
    format!(
        "🚗 *New Customer Enquiry via {brand}!*\n\n\
         Hello *{garage}*, 👋\n\n\
         *{name}* has shown interest in your garage.\n\n\
         📞 *Customer Contact:* {phone}\n\n\
         👉 Please reach out to *{name}* at the above number, or share your service details and charges directly.\n\n\
         — *Team {brand}* 🚀",
        brand = BRAND,
        garage = partner.display_name(),
        name = user_name,
        phone = user_phone,
    )
}

pub fn enquiry_ack_to_user(partner: &Partner, user_name: &str, user_phone: &str) -> String {
    format!(
        "Hey *{}* 👋,\n\n\
         Your enquiry for *{}* has been sent successfully.\n\n\
         The garage owner will reach out to you soon at *{}*.\n\n\
         Thanks for using *{}*! 🚗",
        user_name,
        partner.display_name(),
        user_phone,
        BRAND
    )
}

fn rupees(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("₹{}", amount as i64)
    } else {
        format!("₹{:.2}", amount)
    }
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

fn html_list(title: &str, items: &[&str]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let entries: String = items
        .iter()
        .map(|item| format!("<li>{}</li>", escape_html(item)))
        .collect();
    format!(
        "<div class=\"section\"><h2>{}</h2><ul>{}</ul></div>",
        title, entries
    )
}

/// HTML page served when a garage QR code is opened in a browser.
pub fn render_public_profile(partner: &Partner, scanned_on: &str) -> String {
    let name = escape_html(partner.display_name());
    let phone = escape_html(partner.phone.as_deref().unwrap_or("Not specified"));
    let address = escape_html(partner.address.as_deref().unwrap_or("Not specified"));
    let garage_id = partner
        .garage_id
        .map(|id| id.to_string())
        .unwrap_or_default();

    let photos: String = partner
        .shop_photos
        .iter()
        .enumerate()
        .map(|(i, photo)| {
            format!(
                "<img src=\"{}\" alt=\"Shop Photo {}\" class=\"shop-photo\"/>",
                escape_html(&photo.url),
                i + 1
            )
        })
        .collect();
    let gallery = if photos.is_empty() {
        String::new()
    } else {
        format!("<div class=\"photo-gallery\"><h2>Shop Photos</h2>{}</div>", photos)
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>{name} - Garage Profile</title>
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <style>
    body {{ font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; }}
    .header {{ text-align: center; margin-bottom: 30px; }}
    .contact-info {{ background: #f5f5f5; padding: 20px; border-radius: 8px; }}
    .section {{ margin: 20px 0; }}
    .photo-gallery {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 10px; margin: 20px 0; }}
    .photo-gallery img {{ width: 100%; height: 150px; object-fit: cover; border-radius: 4px; }}
  </style>
</head>
<body>
  <div class="header">
    <h1>{name}</h1>
    <p>Garage ID: {garage_id}</p>
  </div>
  <div class="contact-info">
    <h2>Contact Information</h2>
    <p><strong>Phone:</strong> <a href="tel:{phone}">{phone}</a></p>
    <p><strong>Address:</strong> {address}</p>
  </div>
  {services}
  {brands}
  {gallery}
  <div style="text-align: center; margin-top: 30px; color: #666;">
    <p>Scanned on {scanned_on}</p>
  </div>
</body>
</html>"#,
        name = name,
        garage_id = garage_id,
        phone = phone,
        address = address,
        services = html_list("Services Offered", &partner.selected_services()),
        brands = html_list("Brands Serviced", &partner.all_brands()),
        gallery = gallery,
        scanned_on = escape_html(scanned_on),
    )
}

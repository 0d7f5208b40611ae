//! Fixed pool of reviewer devices for the androidpublisher surface.

use serde::Serialize;

/// Hardware profile reported alongside a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMetadata {
    pub product_name: &'static str,
    pub manufacturer: &'static str,
    pub device_class: &'static str,
    pub screen_width_px: u32,
    pub screen_height_px: u32,
    pub native_platform: &'static str,
    pub screen_density_dpi: u32,
    pub gl_es_version: u32,
    pub cpu_model: &'static str,
    pub cpu_make: &'static str,
    pub ram_mb: u32,
}

const fn phone(
    product_name: &'static str,
    manufacturer: &'static str,
    (screen_width_px, screen_height_px, screen_density_dpi): (u32, u32, u32),
    gl_es_version: u32,
    (cpu_model, cpu_make): (&'static str, &'static str),
    ram_mb: u32,
) -> DeviceMetadata {
    DeviceMetadata {
        product_name,
        manufacturer,
        device_class: "PHONE",
        screen_width_px,
        screen_height_px,
        native_platform: "Android",
        screen_density_dpi,
        gl_es_version,
        cpu_model,
        cpu_make,
        ram_mb,
    }
}

const SD_8_GEN_1: (&str, &str) = ("Snapdragon 8 Gen 1", "Qualcomm");
const SD_8_GEN_2: (&str, &str) = ("Snapdragon 8 Gen 2", "Qualcomm");

pub const PHONES: [DeviceMetadata; 10] = [
    phone("Samsung Galaxy S23", "Samsung", (1080, 2340, 420), 32, SD_8_GEN_2, 8192),
    phone("Google Pixel 7", "Google", (1080, 2400, 440), 32, ("Google Tensor G2", "Google"), 8192),
    phone("OnePlus 11", "OnePlus", (1440, 3216, 565), 32, SD_8_GEN_2, 16384),
    phone("Xiaomi 13", "Xiaomi", (1080, 2400, 440), 31, SD_8_GEN_2, 8192),
    phone("Motorola Edge 30 Pro", "Motorola", (1080, 2400, 400), 32, SD_8_GEN_1, 12288),
    phone("Sony Xperia 1 IV", "Sony", (1644, 3840, 643), 32, SD_8_GEN_1, 12288),
    phone("Nokia G60 5G", "Nokia", (1080, 2400, 400), 30, ("Snapdragon 695 5G", "Qualcomm"), 4096),
    phone("Realme GT 2 Pro", "Realme", (1440, 3216, 560), 32, SD_8_GEN_1, 8192),
    phone("Oppo Find X5 Pro", "Oppo", (1440, 3216, 525), 32, SD_8_GEN_1, 12288),
    phone("Vivo X80 Pro", "Vivo", (1440, 3200, 515), 32, SD_8_GEN_1, 12288),
];

/// Picks a phone from the pool by a stable key.
pub fn phone_for(key: u64) -> &'static DeviceMetadata {
    &PHONES[(key % PHONES.len() as u64) as usize]
}

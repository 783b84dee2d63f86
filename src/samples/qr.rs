use crate::common::errors::BusinessError;
use base64::{Engine, engine::general_purpose::STANDARD};
use qrcode_generator::QrCodeEcc;
use uuid::Uuid;

const QR_SIZE_PX: usize = 250;

/// Link to the unauthenticated sample page of the web client
pub fn public_link(frontend_url: &str, id: Uuid) -> String {
    format!("{}/samples/public/{id}", frontend_url.trim_end_matches('/'))
}

pub fn qr_data_url(text: &str) -> Result<String, BusinessError> {
    let png = qrcode_generator::to_png_to_vec(text, QrCodeEcc::Medium, QR_SIZE_PX)
        .map_err(|e| BusinessError::internal(format!("Failed to encode QR code: {e}")))?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

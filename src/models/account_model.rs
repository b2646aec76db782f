use serde::{Deserialize, Serialize};

/// Cuenta autenticable: teléfono + credenciales de API + ubicación de la sesión.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountSession {
    pub phone: String,
    pub api_id: i64,
    #[serde(skip_serializing)]
    pub api_hash: String,
    pub session_path: String,
}

/// Request para registrar una cuenta
#[derive(Debug, Clone, Deserialize)]
pub struct AddAccountRequest {
    pub phone: String,
    pub api_id: i64,
    pub api_hash: String,
}

/// Un teléfono sólo puede contener '+' inicial y dígitos; se usa como nombre de carpeta.
pub fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

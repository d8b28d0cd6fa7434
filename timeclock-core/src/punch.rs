//! Punch primitives shared between the ledger and the reports.
//!
//! Both enums are persisted as text columns and reported on verbatim, so the
//! wire names are part of the stored format and must not change.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Direction of a punch: the ledger alternates strictly, starting with entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PunchKind {
    Entry,
    Exit,
}

impl PunchKind {
    /// Stable text form used in the database and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            PunchKind::Entry => "ENTRY",
            PunchKind::Exit => "EXIT",
        }
    }
}

impl TryFrom<String> for PunchKind {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "ENTRY" => Ok(PunchKind::Entry),
            "EXIT" => Ok(PunchKind::Exit),
            _ => Err(CoreError::UnknownPunchKind(value)),
        }
    }
}

impl std::fmt::Display for PunchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the employee's identity was verified at punch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationMethod {
    /// Platform authenticator with fingerprint user verification
    DeviceFingerprint,
    /// Platform authenticator with face user verification
    DeviceFace,
    /// Server-side facial recognition (consumed as a boolean signal)
    FacialRecognition,
    /// Emergency PIN fallback
    EmergencyPin,
}

impl VerificationMethod {
    /// Stable text form used in the database and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationMethod::DeviceFingerprint => "DEVICE_FINGERPRINT",
            VerificationMethod::DeviceFace => "DEVICE_FACE",
            VerificationMethod::FacialRecognition => "FACIAL_RECOGNITION",
            VerificationMethod::EmergencyPin => "EMERGENCY_PIN",
        }
    }
}

impl TryFrom<String> for VerificationMethod {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "DEVICE_FINGERPRINT" => Ok(VerificationMethod::DeviceFingerprint),
            "DEVICE_FACE" => Ok(VerificationMethod::DeviceFace),
            "FACIAL_RECOGNITION" => Ok(VerificationMethod::FacialRecognition),
            "EMERGENCY_PIN" => Ok(VerificationMethod::EmergencyPin),
            _ => Err(CoreError::UnknownVerificationMethod(value)),
        }
    }
}

impl std::fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punch_kind_round_trip() {
        assert_eq!(PunchKind::try_from("ENTRY".to_string()), Ok(PunchKind::Entry));
        assert_eq!(PunchKind::try_from("EXIT".to_string()), Ok(PunchKind::Exit));
        assert!(PunchKind::try_from("entry".to_string()).is_err());
        assert_eq!(PunchKind::Entry.as_str(), "ENTRY");
    }

    #[test]
    fn test_verification_method_wire_names() {
        // These names are persisted; a rename would corrupt reporting.
        assert_eq!(VerificationMethod::DeviceFingerprint.as_str(), "DEVICE_FINGERPRINT");
        assert_eq!(VerificationMethod::DeviceFace.as_str(), "DEVICE_FACE");
        assert_eq!(VerificationMethod::FacialRecognition.as_str(), "FACIAL_RECOGNITION");
        assert_eq!(VerificationMethod::EmergencyPin.as_str(), "EMERGENCY_PIN");
    }

    #[test]
    fn test_verification_method_serde() {
        let json = serde_json::to_string(&VerificationMethod::EmergencyPin).unwrap();
        assert_eq!(json, "\"EMERGENCY_PIN\"");

        let parsed: VerificationMethod = serde_json::from_str("\"DEVICE_FACE\"").unwrap();
        assert_eq!(parsed, VerificationMethod::DeviceFace);
    }

    #[test]
    fn test_unknown_values_rejected() {
        let err = VerificationMethod::try_from("PASSWORD".to_string()).unwrap_err();
        assert_eq!(err, CoreError::UnknownVerificationMethod("PASSWORD".to_string()));
    }
}

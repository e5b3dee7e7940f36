use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x1234...abcd` form used in greetings.
    pub fn shortened(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 10 {
            return self.0.clone();
        }
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Upright,
    Reversed,
}

impl Orientation {
    pub fn is_reversed(self) -> bool {
        matches!(self, Orientation::Reversed)
    }
}

/// A drawn card. On the wire the orientation travels as `"reversed": bool`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(rename = "reversed", with = "orientation_flag", default = "upright")]
    pub orientation: Orientation,
}

fn upright() -> Orientation {
    Orientation::Upright
}

mod orientation_flag {
    use super::Orientation;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Orientation, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(value.is_reversed())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Orientation, D::Error> {
        let reversed = bool::deserialize(deserializer)?;
        Ok(if reversed {
            Orientation::Reversed
        } else {
            Orientation::Upright
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reading {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    Orb,
    Device,
}

/// Proof emitted by the host's identity-verify command, forwarded untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityProof {
    pub proof: String,
    pub merkle_root: String,
    pub nullifier_hash: String,
    pub verification_level: VerificationLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub wallet_address: WalletAddress,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub id: u64,
    pub wallet_address: WalletAddress,
    pub username: Option<String>,
    pub is_verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub proof: IdentityProof,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodaysReadingResponse {
    pub reading: Reading,
    #[serde(rename = "drawnCards")]
    pub drawn_cards: Vec<Card>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReadingRequest {
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClarificationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClarificationResponse {
    pub clarification: String,
}

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, alias = "error")]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_orientation_travels_as_reversed_flag() {
        let card = Card {
            id: 16,
            name: "The Tower".to_owned(),
            image: "major/16-the-tower.jpg".to_owned(),
            orientation: Orientation::Reversed,
        };

        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["reversed"], serde_json::Value::Bool(true));
        assert!(value.get("orientation").is_none());

        let parsed: Card =
            serde_json::from_str(r#"{"id":0,"name":"The Fool","reversed":false}"#).unwrap();
        assert_eq!(parsed.orientation, Orientation::Upright);
        assert_eq!(parsed.image, "");
    }

    #[test]
    fn todays_reading_uses_camel_case_cards_field() {
        let raw = r#"{
            "reading": {"text": "A journey begins."},
            "drawnCards": [
                {"id": 1, "name": "The Magician", "image": "a.jpg", "reversed": false},
                {"id": 2, "name": "The High Priestess", "image": "b.jpg", "reversed": true},
                {"id": 3, "name": "The Empress", "image": "c.jpg", "reversed": false}
            ]
        }"#;

        let parsed: TodaysReadingResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.drawn_cards.len(), 3);
        assert_eq!(parsed.reading.text, "A journey begins.");
        assert!(parsed.reading.clarification.is_none());
    }

    #[test]
    fn error_response_accepts_detail_or_error() {
        let detail: ErrorResponse = serde_json::from_str(r#"{"detail":"already verified"}"#).unwrap();
        assert_eq!(detail.detail.as_deref(), Some("already verified"));

        let error: ErrorResponse = serde_json::from_str(r#"{"error":"bad wallet"}"#).unwrap();
        assert_eq!(error.detail.as_deref(), Some("bad wallet"));
    }

    #[test]
    fn shortened_address_keeps_prefix_and_suffix() {
        let address = WalletAddress("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045".to_owned());
        assert_eq!(address.shortened(), "0xd8dA...6045");

        let short = WalletAddress("0xabc".to_owned());
        assert_eq!(short.shortened(), "0xabc");
    }
}

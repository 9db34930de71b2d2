pub mod fixtures;
pub mod integration;
pub mod unit;

pub mod helpers {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::{Deserialize, Serialize};
    use std::time::{SystemTime, UNIX_EPOCH};
    use uuid::Uuid;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Claims {
        pub sub: String,
        pub role: String,
        pub exp: usize,
    }

    pub fn generate_test_jwt(subject: Uuid, role: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let expiration = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() + 3600;

        let claims = Claims { sub: subject.to_string(), role: role.to_string(), exp: expiration as usize };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret-key"))
    }
}

#![allow(dead_code)]

use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use callsync_registry_client::{HttpCallRegistry, RegistryConfig};

/// Token shaped like the registry's: `{ sub, userId, email }`
pub fn token_for(user_id: &str) -> String {
    let claims = json!({
        "sub": user_id,
        "userId": user_id,
        "email": format!("{}@example.com", user_id),
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"registry-secret")).unwrap()
}

pub fn registry(uri: &str, user_id: &str) -> HttpCallRegistry {
    HttpCallRegistry::new(RegistryConfig::new(uri).with_token(token_for(user_id))).unwrap()
}

pub fn participant(id: &str, user_id: &str, role: &str, status: &str, presence: &str) -> Value {
    json!({
        "id": id,
        "callId": "c1",
        "userId": user_id,
        "role": role,
        "status": status,
        "joinedAt": "2024-05-01T10:00:00.000Z",
        "leftAt": null,
        "user": {
            "id": user_id,
            "email": format!("{}@example.com", user_id),
            "name": null,
            "status": presence,
        },
    })
}

/// Call as the registry returns it, including fields the client ignores
pub fn call_json(id: &str, status: &str, participants: Vec<Value>) -> Value {
    json!({
        "id": id,
        "type": "AUDIO",
        "status": status,
        "initiatorId": "u1",
        "startedAt": null,
        "endedAt": null,
        "duration": null,
        "createdAt": "2024-05-01T10:00:00.000Z",
        "updatedAt": "2024-05-01T10:00:00.000Z",
        "initiator": { "id": "u1", "email": "u1@example.com", "name": "Alice", "status": "ONLINE" },
        "participants": participants,
    })
}

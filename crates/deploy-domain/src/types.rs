use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

// ── Lifecycle state machine ───────────────────────────────────────────────────

/// The lifecycle state of a provisioning request.
///
/// Happy path:
///   Pending → CreatingDeployment → CreatedDeployment
///     → CreatingPublishedService → CreatedPublishedService → Success
///
/// Deletion path:
///   Deleting → DeletingDeployment → DeletedDeployment
///     → DeletingPublishedService → DeletedPublishedService → Deleted
///
/// `Failed` is reachable from any non-terminal state and is itself terminal,
/// as are `Success` and `Deleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProvisionState {
    Pending,
    CreatingDeployment,
    CreatedDeployment,
    CreatingPublishedService,
    CreatedPublishedService,
    Success,
    Failed,
    Deleting,
    DeletingDeployment,
    DeletedDeployment,
    DeletingPublishedService,
    DeletedPublishedService,
    Deleted,
}

impl ProvisionState {
    /// Terminal states never dispatch again: `Success`, `Failed`, `Deleted`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProvisionState::Success | ProvisionState::Failed | ProvisionState::Deleted)
    }
}

impl fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProvisionState::Pending => "PENDING",
            ProvisionState::CreatingDeployment => "CREATING_DEPLOYMENT",
            ProvisionState::CreatedDeployment => "CREATED_DEPLOYMENT",
            ProvisionState::CreatingPublishedService => "CREATING_PUBLISHED_SERVICE",
            ProvisionState::CreatedPublishedService => "CREATED_PUBLISHED_SERVICE",
            ProvisionState::Success => "SUCCESS",
            ProvisionState::Failed => "FAILED",
            ProvisionState::Deleting => "DELETING",
            ProvisionState::DeletingDeployment => "DELETING_DEPLOYMENT",
            ProvisionState::DeletedDeployment => "DELETED_DEPLOYMENT",
            ProvisionState::DeletingPublishedService => "DELETING_PUBLISHED_SERVICE",
            ProvisionState::DeletedPublishedService => "DELETED_PUBLISHED_SERVICE",
            ProvisionState::Deleted => "DELETED",
        };
        write!(f, "{s}")
    }
}

// ── Spec ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(default, rename = "image_tag", skip_serializing_if = "String::is_empty")]
    pub image_tag: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,
}

impl Container {
    /// The fully-qualified image reference passed to the platform: `"{image}:{tag}"`.
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.image_tag)
    }
}

/// Publication policy: expose a port via an internal cluster address or a
/// load-balanced external address. Empty means no publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishedServiceType {
    #[serde(rename = "ClusterIP")]
    ClusterIp,
    LoadBalancer,
}

impl fmt::Display for PublishedServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishedServiceType::ClusterIp => write!(f, "ClusterIP"),
            PublishedServiceType::LoadBalancer => write!(f, "LoadBalancer"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty", rename = "type")]
    pub r#type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<Container>,
    #[serde(default, rename = "published_service_type", skip_serializing_if = "Option::is_none")]
    pub published_service_type: Option<PublishedServiceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ProvisionState>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, rename = "external_ip", skip_serializing_if = "String::is_empty")]
    pub external_ip: String,
}

impl ProvisionStatus {
    pub fn failed(message: impl Into<String>) -> Self {
        ProvisionStatus { state: Some(ProvisionState::Failed), message: message.into(), external_ip: String::new() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
}

/// The unit of work: one deployable workload plus its lifecycle status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ProvisionMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<ProvisionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProvisionStatus>,
}

impl Request {
    /// Assigns a uuid when absent; validates one when present.
    /// Returns the resolved uuid on success.
    pub fn ensure_uuid(&mut self) -> Result<Uuid, DomainError> {
        let meta = self.metadata.get_or_insert_with(ProvisionMetadata::default);
        match meta.uuid {
            Some(id) => Ok(id),
            None => {
                let id = Uuid::new_v4();
                meta.uuid = Some(id);
                Ok(id)
            }
        }
    }

    pub fn uuid(&self) -> Option<Uuid> {
        self.metadata.as_ref().and_then(|m| m.uuid)
    }

    pub fn state(&self) -> Option<ProvisionState> {
        self.status.as_ref().and_then(|s| s.state)
    }

    pub fn set_state(&mut self, state: ProvisionState) {
        self.status.get_or_insert_with(ProvisionStatus::default).state = Some(state);
    }

    /// Validates the fields Ingress is responsible for: non-empty name, type,
    /// and at least one container. Does not touch `uuid` — see `ensure_uuid`.
    pub fn validate_spec(&self) -> Result<(), DomainError> {
        let spec = self.spec.as_ref().ok_or(DomainError::EmptyName)?;
        if spec.name.is_empty() {
            return Err(DomainError::EmptyName);
        }
        if spec.r#type.is_empty() {
            return Err(DomainError::EmptyType);
        }
        if spec.containers.is_empty() {
            return Err(DomainError::EmptyContainers);
        }
        Ok(())
    }
}

/// Parse and validate a uuid string the way Ingress does for path parameters.
pub fn parse_uuid(s: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(s).map_err(|_| DomainError::InvalidUuid(s.to_string()))
}

// ── Encoded snapshot ───────────────────────────────────────────────────────────

/// Maximum length of an encoded snapshot, matching the store column bound.
pub const MAX_ENCODED_SNAPSHOT_LEN: usize = 16383;

/// Base64(JSON) encoding of a `Request`, carried by both the store and the queue.
pub fn encode_snapshot(request: &Request) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(request)?;
    Ok(STANDARD.encode(json))
}

/// Inverse of `encode_snapshot`.
pub fn decode_snapshot(encoded: &str) -> Result<Request, SnapshotDecodeError> {
    let bytes = STANDARD.decode(encoded)?;
    let request = serde_json::from_slice(&bytes)?;
    Ok(request)
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotDecodeError {
    #[error("base64 decode: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("json decode: {0}")]
    Json(#[from] serde_json::Error),
}

// ── DurableRecord ──────────────────────────────────────────────────────────────

/// The stored projection of a `Request`: flat columns kept in lockstep with
/// the base64-JSON `encoded_snapshot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurableRecord {
    pub uuid: Uuid,
    pub name: String,
    pub r#type: String,
    pub state: ProvisionState,
    pub encoded_snapshot: String,
}

impl DurableRecord {
    /// Builds a record from a `Request`, keeping flat columns and snapshot in
    /// agreement. Fails only if the request cannot be encoded or is missing
    /// fields that should already have been validated by the caller.
    pub fn from_request(request: &Request) -> Result<Self, DomainError> {
        let uuid = request.uuid().ok_or_else(|| DomainError::InvalidUuid(String::new()))?;
        let spec = request.spec.as_ref().ok_or(DomainError::EmptyName)?;
        let state = request.state().unwrap_or(ProvisionState::Pending);
        let encoded_snapshot =
            encode_snapshot(request).map_err(|e| DomainError::InvalidTransition {
                from: state.to_string(),
                to: format!("encode failed: {e}"),
            })?;
        Ok(DurableRecord {
            uuid,
            name: spec.name.clone(),
            r#type: spec.r#type.clone(),
            state,
            encoded_snapshot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_uuid_assigns_when_absent() {
        let mut req = Request::default();
        let id = req.ensure_uuid().unwrap();
        assert_eq!(req.uuid(), Some(id));
    }

    #[test]
    fn ensure_uuid_keeps_existing() {
        let existing = Uuid::new_v4();
        let mut req = Request {
            metadata: Some(ProvisionMetadata { uuid: Some(existing) }),
            ..Default::default()
        };
        assert_eq!(req.ensure_uuid().unwrap(), existing);
    }

    #[test]
    fn validate_spec_rejects_empty_containers() {
        let req = Request {
            spec: Some(ProvisionSpec {
                name: "web".into(),
                r#type: "svc".into(),
                containers: vec![],
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(req.validate_spec(), Err(DomainError::EmptyContainers)));
    }

    #[test]
    fn round_trip_encode_decode() {
        let mut req = Request {
            spec: Some(ProvisionSpec {
                name: "web".into(),
                r#type: "svc".into(),
                containers: vec![Container {
                    name: "c".into(),
                    image: "nginx".into(),
                    image_tag: "1.25".into(),
                    ports: vec![Port { name: "http".into(), port: 80 }],
                }],
                published_service_type: Some(PublishedServiceType::ClusterIp),
                expose: Some(80),
            }),
            ..Default::default()
        };
        req.ensure_uuid().unwrap();
        req.set_state(ProvisionState::Pending);

        let encoded = encode_snapshot(&req).unwrap();
        let decoded = decode_snapshot(&encoded).unwrap();
        assert_eq!(req, decoded);
    }

    #[test]
    fn state_display_matches_wire_labels() {
        assert_eq!(ProvisionState::CreatingDeployment.to_string(), "CREATING_DEPLOYMENT");
        assert_eq!(ProvisionState::Success.to_string(), "SUCCESS");
    }

    #[test]
    fn parse_uuid_rejects_malformed() {
        assert!(parse_uuid("not-a-uuid").is_err());
    }

    #[test]
    fn published_service_type_wire_strings_match_spec() {
        assert_eq!(serde_json::to_string(&PublishedServiceType::ClusterIp).unwrap(), "\"ClusterIP\"");
        assert_eq!(serde_json::to_string(&PublishedServiceType::LoadBalancer).unwrap(), "\"LoadBalancer\"");
        assert_eq!(
            serde_json::from_str::<PublishedServiceType>("\"ClusterIP\"").unwrap(),
            PublishedServiceType::ClusterIp
        );
    }
}

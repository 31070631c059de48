pub mod error;
pub mod types;

pub use error::DomainError;
pub use types::{
    decode_snapshot, encode_snapshot, parse_uuid, Container, DurableRecord, Port, ProvisionMetadata,
    ProvisionSpec, ProvisionState, ProvisionStatus, PublishedServiceType, Request,
    SnapshotDecodeError, MAX_ENCODED_SNAPSHOT_LEN,
};

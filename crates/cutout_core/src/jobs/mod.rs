//! Job store and admission types.

mod store;
mod types;

pub use store::{AdmissionPolicy, IdGenerator, JobStore};
pub use types::{
    AdmissionReport, FileInput, Job, JobStatus, RejectedFile, ResultHandle, StoreError,
    ValidationError,
};

pub(crate) use store::ClaimedJob;

pub mod application;
pub mod status;

pub use application::{
    ApplicationResponse, ChangeStatusRequest, CreateApplicationRequest, ListApplicationsQuery,
    ListApplicationsResponse, UpdateApplicationRequest, clamp_page_size,
};
pub use status::{ApplicationStatus, UnknownStatus};

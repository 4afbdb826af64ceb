pub mod config;
pub mod error;
pub mod export;
pub mod mapper;
pub mod models;
pub mod store;

pub use config::RittenConfig;
pub use error::{Result, RittenError};
pub use export::{output_filename, render_workbook, SHEET_NAME, XLSX_CONTENT_TYPE};
pub use mapper::{parse_trips, parse_trips_bytes, ENVELOPE_NAMESPACE, RIT_NAMESPACE};
pub use models::{
    DataPage, PageQuery, Pagination, SessionInfo, SessionSnapshot, SessionSummary, TripField,
    TripRecord,
};
pub use store::SessionStore;

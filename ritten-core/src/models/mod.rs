pub mod session;
pub mod trip;

pub use session::{
    DataPage, PageQuery, Pagination, Session, SessionInfo, SessionSnapshot, SessionSummary,
    DEFAULT_PAGE, DEFAULT_PER_PAGE,
};
pub use trip::{TripField, TripRecord};

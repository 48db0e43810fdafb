mod endpoint;
mod entity;
mod fault_class;
mod status;

pub use endpoint::{Endpoint, RoleKey};
pub use entity::{BindingMode, LogicalDevice};
pub use fault_class::FaultClass;
pub use status::DeviceStatus;

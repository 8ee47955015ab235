pub mod mac;
pub mod resource;
pub mod tenant;
pub mod wtp;

pub use mac::{MacAddress, Ssid};
pub use resource::{Band, BlockSpec, ResourceBlock, ResourceDescriptor, ResourcePool};
pub use tenant::Tenant;
pub use wtp::{PhysicalPort, Wtp};

pub mod clock;
pub mod registry;
pub mod room_controller;
pub mod wall;

pub use registry::RoomRegistry;
pub use room_controller::RoomController;

pub mod controller;

pub use controller::{
    ScrollUpdate, SessionCommand, SessionController, SessionHandle, SessionSnapshot,
    spawn_session,
};

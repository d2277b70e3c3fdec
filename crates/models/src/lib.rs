pub mod db;
pub mod errors;
pub mod message;
pub mod scope_user;
pub mod scoping_session;
pub mod site;
pub mod ticket;

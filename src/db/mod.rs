pub mod assignments;
pub mod audit;
pub mod developers;
pub mod organizations;
pub mod refresh_tokens;
pub mod sessions;
pub mod users;

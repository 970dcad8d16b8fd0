/// User persistence collaborator
///
/// The token core only reads users; create/update/delete exist for
/// provisioning and tests.

mod memory;
mod model;
mod postgres;
mod store;

pub use memory::InMemoryUserStore;
pub use model::{NewUser, Role, UserChanges, UserRecord};
pub use postgres::PgUserStore;
pub use store::UserStore;

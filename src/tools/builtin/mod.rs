//! Built-in tools.
//!
//! Side effects are simulated: each tool validates its parameters and
//! reports what it would have done.

mod account;
mod database;
mod echo;
mod email;
mod refund;
mod session;

pub use account::DeleteUserAccountTool;
pub use database::{RunSqlQueryTool, UpdateDatabaseSchemaTool};
pub use echo::EchoTool;
pub use email::SendBulkEmailTool;
pub use refund::ProcessRefundTool;
pub use session::{
    AddSessionNoteTool, ClearUserContextTool, GetSessionInfoTool, GetUserInfoTool,
    SetUserContextTool, UpdatePreferenceTool,
};

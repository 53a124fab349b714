//! Re-exports

pub use super::channels::ChannelOpt;
pub use super::generate::GenerateArgs;
pub use super::generate::GenerateOpt;
pub use super::inputoutput::DataOutputFormat;
pub use super::inputoutput::DataOutputMode;
pub use super::inputoutput::InputOutputOpt;
pub use super::lib::Config;
pub use super::test_util::MockConfig;
pub use super::util::UtilOpt;
pub use super::view::ViewCommands;
pub use super::view::ViewOpt;

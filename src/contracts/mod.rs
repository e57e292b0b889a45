pub mod erc20;
pub mod onclick;

pub use erc20::IERC20;
pub use onclick::OnClick;

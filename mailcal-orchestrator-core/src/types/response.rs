//! 写操作返回类型

use serde::Serialize;

/// Which account a routed write went through.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub account_id: String,
    pub provider: String,
}

// ==========================================
// 零售数仓一致性引擎 - 数据集一致性规则
// ==========================================
// 每个源数据集一个模块：字段规则表 + 词表绑定 + 对账接线
// ==========================================

pub mod ecom;
pub mod inventory;
pub mod pos;
pub mod product;
pub mod returns;
pub mod store;

pub use ecom::{EcomLineClean, EcomLineConformer, EcomOrderClean, EcomOrderConformer};
pub use inventory::{InventoryClean, InventoryConformer};
pub use pos::{PosLineClean, PosLineConformer, PosTransactionClean, PosTransactionConformer};
pub use product::{ProductClean, ProductConformer};
pub use returns::{ReturnClean, ReturnConformer};
pub use store::{StoreClean, StoreConformer};

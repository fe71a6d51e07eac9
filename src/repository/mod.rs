// ==========================================
// 零售数仓一致性引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod clean_repo;
pub mod dimension_repo;
pub mod error;
pub mod fact_repo;
pub mod schema;

// 重导出核心仓储
pub use clean_repo::CleanRepository;
pub use dimension_repo::DimensionRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use fact_repo::FactRepository;
pub use schema::init_schema;

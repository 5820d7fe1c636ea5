use sqlx::PgPool;

/// Runs the query objects declared next to each entity.
///
/// Every query is a plain struct with a `Processor<Query> for DatabaseProcessor`
/// impl, so call sites read as `db.process(GetApplicationById { id }).await`.
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

impl DatabaseProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

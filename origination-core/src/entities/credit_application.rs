use crate::entities::ApplicationStatus;
use crate::framework::DatabaseProcessor;
use crate::status_machine::{self, TransitionError, Transitioned};
use kanau::processor::Processor;
use rust_decimal::Decimal;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CreditApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub to_bank_account_id: Uuid,
    pub disbursement_amount: Decimal,
    pub origination_amount: Decimal,
    pub term: i32,
    pub interest: Decimal,
    pub product_code: String,
    pub product_version: String,
    pub status: ApplicationStatus,
    pub reject_reason: Option<String>,
    /// Optimistic concurrency counter, bumped by every successful update.
    pub version: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// The part of an application a customer may amend while it is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationTerms {
    pub to_bank_account_id: Uuid,
    pub disbursement_amount: Decimal,
    pub origination_amount: Decimal,
    pub term: i32,
    pub interest: Decimal,
    pub product_code: String,
    pub product_version: String,
}

/// Input for a brand-new application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCreditApplication {
    pub user_id: Uuid,
    pub terms: ApplicationTerms,
}

/// A construction constraint that was violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("disbursement amount must be greater than zero")]
    NonPositiveDisbursement,
    #[error("origination amount must be greater than zero")]
    NonPositiveOrigination,
    #[error("origination amount must not exceed disbursement amount")]
    OriginationExceedsDisbursement,
    #[error("term must be greater than zero")]
    NonPositiveTerm,
    #[error("term is out of range")]
    TermOutOfRange,
    #[error("interest must be greater than zero")]
    NonPositiveInterest,
    #[error("user id must not be empty")]
    MissingUserId,
    #[error("destination bank account id must not be empty")]
    MissingBankAccountId,
    #[error("product version must not be empty")]
    MissingProductVersion,
}

impl ValidationError {
    /// Name of the offending request field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::NonPositiveDisbursement => "disbursement_amount",
            ValidationError::NonPositiveOrigination
            | ValidationError::OriginationExceedsDisbursement => "origination_amount",
            ValidationError::NonPositiveTerm | ValidationError::TermOutOfRange => "term",
            ValidationError::NonPositiveInterest => "interest",
            ValidationError::MissingUserId => "user_id",
            ValidationError::MissingBankAccountId => "to_bank_account_id",
            ValidationError::MissingProductVersion => "product_version",
        }
    }
}

fn validate_terms(user_id: Uuid, terms: ApplicationTerms) -> Result<ApplicationTerms, ValidationError> {
    if terms.disbursement_amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveDisbursement);
    }
    if terms.origination_amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveOrigination);
    }
    if terms.origination_amount > terms.disbursement_amount {
        return Err(ValidationError::OriginationExceedsDisbursement);
    }
    if terms.term <= 0 {
        return Err(ValidationError::NonPositiveTerm);
    }
    if terms.interest <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveInterest);
    }
    if user_id.is_nil() {
        return Err(ValidationError::MissingUserId);
    }
    if terms.to_bank_account_id.is_nil() {
        return Err(ValidationError::MissingBankAccountId);
    }
    let product_version = terms.product_version.trim().to_lowercase();
    if product_version.is_empty() {
        return Err(ValidationError::MissingProductVersion);
    }
    Ok(ApplicationTerms {
        product_version,
        ..terms
    })
}

impl NewCreditApplication {
    /// Validate the input and build a `Draft` application.
    ///
    /// Rules are checked in a fixed order and the first violation wins.
    pub fn validate(self) -> Result<CreditApplication, ValidationError> {
        let terms = validate_terms(self.user_id, self.terms)?;
        let now = OffsetDateTime::now_utc();
        Ok(CreditApplication {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            to_bank_account_id: terms.to_bank_account_id,
            disbursement_amount: terms.disbursement_amount,
            origination_amount: terms.origination_amount,
            term: terms.term,
            interest: terms.interest,
            product_code: terms.product_code,
            product_version: terms.product_version,
            status: ApplicationStatus::Draft,
            reject_reason: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

impl CreditApplication {
    /// Replace the monetary and product terms. Status and identity are kept.
    pub fn amend(&mut self, terms: ApplicationTerms) -> Result<(), ValidationError> {
        let terms = validate_terms(self.user_id, terms)?;
        self.to_bank_account_id = terms.to_bank_account_id;
        self.disbursement_amount = terms.disbursement_amount;
        self.origination_amount = terms.origination_amount;
        self.term = terms.term;
        self.interest = terms.interest;
        self.product_code = terms.product_code;
        self.product_version = terms.product_version;
        self.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    /// Move to `requested` if the status graph allows it.
    pub fn change_status(&mut self, requested: ApplicationStatus) -> Result<(), TransitionError> {
        let Transitioned { status, updated_at } =
            status_machine::transition(self.status, requested, OffsetDateTime::now_utc())?;
        self.status = status;
        self.updated_at = updated_at;
        Ok(())
    }
}

const SELECT_COLUMNS: &str = r#"
    id, user_id, to_bank_account_id, disbursement_amount, origination_amount, term,
    interest, product_code, product_version, status, reject_reason, version,
    created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct GetApplicationById {
    pub id: Uuid,
}

impl Processor<GetApplicationById> for DatabaseProcessor {
    type Output = Option<CreditApplication>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetApplicationById")]
    async fn process(
        &self,
        query: GetApplicationById,
    ) -> Result<Option<CreditApplication>, sqlx::Error> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM credit_applications WHERE id = $1");
        sqlx::query_as::<_, CreditApplication>(&sql)
            .bind(query.id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct InsertApplication {
    pub application: CreditApplication,
}

impl Processor<InsertApplication> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertApplication")]
    async fn process(&self, insert: InsertApplication) -> Result<(), sqlx::Error> {
        let app = insert.application;
        sqlx::query(
            r#"
            INSERT INTO credit_applications (
                id, user_id, to_bank_account_id, disbursement_amount, origination_amount,
                term, interest, product_code, product_version, status, reject_reason,
                version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(app.id)
        .bind(app.user_id)
        .bind(app.to_bank_account_id)
        .bind(app.disbursement_amount)
        .bind(app.origination_amount)
        .bind(app.term)
        .bind(app.interest)
        .bind(app.product_code)
        .bind(app.product_version)
        .bind(app.status)
        .bind(app.reject_reason)
        .bind(app.version)
        .bind(app.created_at)
        .bind(app.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Write every mutable column, but only if the stored row still carries
/// `application.version`.
///
/// Returns the stored row (with the bumped version), or `None` when no row
/// matched either because it is gone or because another writer got there first.
pub struct UpdateApplicationVersioned {
    pub application: CreditApplication,
}

impl Processor<UpdateApplicationVersioned> for DatabaseProcessor {
    type Output = Option<CreditApplication>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpdateApplicationVersioned")]
    async fn process(
        &self,
        cmd: UpdateApplicationVersioned,
    ) -> Result<Option<CreditApplication>, sqlx::Error> {
        let app = cmd.application;
        let sql = format!(
            r#"
            UPDATE credit_applications
            SET to_bank_account_id = $3,
                disbursement_amount = $4,
                origination_amount = $5,
                term = $6,
                interest = $7,
                product_code = $8,
                product_version = $9,
                status = $10,
                reject_reason = $11,
                updated_at = $12,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {SELECT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, CreditApplication>(&sql)
            .bind(app.id)
            .bind(app.version)
            .bind(app.to_bank_account_id)
            .bind(app.disbursement_amount)
            .bind(app.origination_amount)
            .bind(app.term)
            .bind(app.interest)
            .bind(app.product_code)
            .bind(app.product_version)
            .bind(app.status)
            .bind(app.reject_reason)
            .bind(app.updated_at)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct DeleteApplication {
    pub id: Uuid,
}

impl Processor<DeleteApplication> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DeleteApplication")]
    async fn process(&self, cmd: DeleteApplication) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM credit_applications WHERE id = $1")
            .bind(cmd.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone)]
/// One page of applications, oldest first. An empty `statuses` list matches
/// every status.
pub struct ListApplications {
    pub statuses: Vec<ApplicationStatus>,
    pub offset: i64,
    pub limit: i64,
}

fn status_tags(statuses: &[ApplicationStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

impl Processor<ListApplications> for DatabaseProcessor {
    type Output = Vec<CreditApplication>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListApplications")]
    async fn process(
        &self,
        query: ListApplications,
    ) -> Result<Vec<CreditApplication>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM credit_applications
            WHERE cardinality($1::text[]) = 0 OR status::text = ANY($1::text[])
            ORDER BY created_at ASC, id ASC
            OFFSET $2
            LIMIT $3
            "#
        );
        sqlx::query_as::<_, CreditApplication>(&sql)
            .bind(status_tags(&query.statuses))
            .bind(query.offset)
            .bind(query.limit)
            .fetch_all(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct CountApplications {
    pub statuses: Vec<ApplicationStatus>,
}

impl Processor<CountApplications> for DatabaseProcessor {
    type Output = i64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CountApplications")]
    async fn process(&self, query: CountApplications) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM credit_applications
            WHERE cardinality($1::text[]) = 0 OR status::text = ANY($1::text[])
            "#,
        )
        .bind(status_tags(&query.statuses))
        .fetch_one(&self.pool)
        .await
    }
}

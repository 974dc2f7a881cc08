//! Account service - account views and account detail
//!
//! Every read goes to the aggregator; nothing is cached. Links are read
//! concurrently and joined before the overview is built.

use std::sync::Arc;

use futures::future::join_all;

use crate::config::BatchPolicy;
use crate::domain::result::{Error, Result};
use crate::domain::{AccountDetail, AccountFailure, AccountView, AccountsOverview, BankLink, Institution};
use crate::ports::{AccountsGetResponse, AggregatorClient, BankStore, TransactionProvider};
use crate::services::institution::InstitutionService;
use crate::services::transactions::merge_transactions;

/// Account reads over the aggregator, the bank store and the transaction feed
pub struct AccountService {
    store: Arc<dyn BankStore>,
    aggregator: Arc<dyn AggregatorClient>,
    institutions: Arc<InstitutionService>,
    transactions: Arc<dyn TransactionProvider>,
    batch_policy: BatchPolicy,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn BankStore>,
        aggregator: Arc<dyn AggregatorClient>,
        institutions: Arc<InstitutionService>,
        transactions: Arc<dyn TransactionProvider>,
    ) -> Self {
        Self {
            store,
            aggregator,
            institutions,
            transactions,
            batch_policy: BatchPolicy::default(),
        }
    }

    pub fn with_batch_policy(mut self, batch_policy: BatchPolicy) -> Self {
        self.batch_policy = batch_policy;
        self
    }

    pub fn batch_policy(&self) -> BatchPolicy {
        self.batch_policy
    }

    /// Views for every bank link of `user_id`, with totals
    ///
    /// One aggregator lookup per link, all in flight at once. Under
    /// `AllOrNothing` the first failing link (in link order) fails the
    /// call; under `ReportPartial` failing links are listed in `failures`.
    pub async fn get_accounts(&self, user_id: &str) -> Result<AccountsOverview> {
        let links = self.store.get_banks(user_id).await.map_err(|e| {
            tracing::error!(user_id, "failed to list bank links: {}", e);
            e
        })?;
        let total_banks = links.len();

        let results = join_all(links.iter().map(|link| self.read_view(link))).await;

        let mut data = Vec::with_capacity(total_banks);
        let mut failures = Vec::new();
        for (link, result) in links.iter().zip(results) {
            match result {
                Ok(view) => data.push(view),
                Err(e) => {
                    tracing::error!(link_id = %link.id, "failed to get account: {}", e);
                    match self.batch_policy {
                        BatchPolicy::AllOrNothing => return Err(e),
                        BatchPolicy::ReportPartial => failures.push(AccountFailure {
                            link_id: link.id.clone(),
                            kind: e.kind(),
                            message: e.to_string(),
                        }),
                    }
                }
            }
        }

        tracing::info!(
            user_id,
            total_banks,
            failed = failures.len(),
            "accounts retrieved"
        );
        Ok(AccountsOverview::new(data, total_banks, failures))
    }

    /// One account view plus its merged transaction history
    pub async fn get_account(&self, link_id: &str) -> Result<AccountDetail> {
        self.read_detail(link_id).await.map_err(|e| {
            tracing::error!(link_id, "failed to get account: {}", e);
            e
        })
    }

    async fn read_detail(&self, link_id: &str) -> Result<AccountDetail> {
        let link = self.store.get_bank(link_id).await?;

        let external = async {
            let user = self.store.get_logged_in_user().await?;
            self.transactions
                .get_transactions(&link.access_token, &user)
                .await
        };
        let (response, transfers, external) = tokio::try_join!(
            self.aggregator.accounts_get(&link.access_token),
            self.store.get_transactions_by_bank_id(&link.id),
            external,
        )?;

        let institution_id = response.institution_id()?;
        let institution = self.institutions.get_institution(institution_id).await?;
        let view = build_view(&link, &response, &institution)?;

        let transactions = merge_transactions(&link.id, external, &transfers);
        Ok(AccountDetail {
            data: view,
            transactions,
        })
    }

    async fn read_view(&self, link: &BankLink) -> Result<AccountView> {
        let response = self.aggregator.accounts_get(&link.access_token).await?;
        let institution_id = response.institution_id()?;
        let institution = self.institutions.get_institution(institution_id).await?;
        build_view(link, &response, &institution)
    }
}

/// Project the link's first aggregator account into a view
pub fn build_view(
    link: &BankLink,
    response: &AccountsGetResponse,
    institution: &Institution,
) -> Result<AccountView> {
    let account = response.primary_account()?;
    let institution_id = response.institution_id()?;
    let current_balance = account.balances.current.ok_or_else(|| {
        Error::invalid(format!(
            "account {} has no current balance",
            account.account_id
        ))
    })?;

    Ok(AccountView {
        id: account.account_id.clone(),
        available_balance: account.balances.available,
        current_balance,
        institution_id: institution_id.to_string(),
        institution_name: Some(institution.name.clone()),
        name: account.name.clone(),
        official_name: account.official_name.clone(),
        mask: account.mask.clone(),
        account_type: account.account_type.clone(),
        subtype: account.subtype.clone(),
        link_id: link.id.clone(),
        shareable_id: Some(link.shareable_id.clone()),
    })
}

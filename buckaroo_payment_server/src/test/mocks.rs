use buckaroo_payment_engine::{
    db_types::{Client, NewTransaction, Order, Transaction},
    lifecycle::Transition,
    traits::{PaymentGatewayDatabase, PaymentGatewayError},
};
use mockall::mock;

mock! {
    pub PaymentDb {}
    impl PaymentGatewayDatabase for PaymentDb {
        fn url(&self) -> &str;
        async fn insert_transaction(&self, transaction: NewTransaction) -> Result<Transaction, PaymentGatewayError>;
        async fn fetch_transaction(&self, id: i64) -> Result<Option<Transaction>, PaymentGatewayError>;
        async fn fetch_transaction_by_payment_key(&self, payment_key: &str) -> Result<Option<Transaction>, PaymentGatewayError>;
        async fn fetch_transaction_by_transaction_key(&self, transaction_key: &str) -> Result<Option<Transaction>, PaymentGatewayError>;
        async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, PaymentGatewayError>;
        async fn fetch_client_for_order(&self, order: &Order) -> Result<Client, PaymentGatewayError>;
        async fn update_gateway_keys<'a, 'b>(&self, transaction_id: i64, payment_key: Option<&'a str>, transaction_key: Option<&'b str>) -> Result<(), PaymentGatewayError>;
        async fn set_redirect_url(&self, transaction_id: i64, redirect_url: &str) -> Result<(), PaymentGatewayError>;
        async fn stamp_last_push(&self, transaction_id: i64) -> Result<(), PaymentGatewayError>;
        async fn mark_refunded(&self, transaction_id: i64) -> Result<(), PaymentGatewayError>;
        async fn apply_transition(&self, transaction_id: i64, transition: Transition) -> Result<Transaction, PaymentGatewayError>;
    }
}

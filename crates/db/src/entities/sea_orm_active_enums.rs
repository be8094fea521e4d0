//! PostgreSQL enum types and their mapping to domain enums.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use tokensale_core::sale::{SaftRequirement as DomainSaft, SaleStatus as DomainSaleStatus};
use tokensale_core::transaction::{
    FormOfPayment as DomainFormOfPayment, TransactionStatus as DomainTransactionStatus,
};
use tokensale_core::user::KycStatus as DomainKycStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "sale_status")]
pub enum SaleStatus {
    #[sea_orm(string_value = "CREATED")]
    Created,
    #[sea_orm(string_value = "OPEN")]
    Open,
    #[sea_orm(string_value = "CLOSED")]
    Closed,
    #[sea_orm(string_value = "FINISHED")]
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "saft_requirement")]
pub enum SaftRequirement {
    #[sea_orm(string_value = "NOT_REQUIRED")]
    NotRequired,
    #[sea_orm(string_value = "REQUIRED")]
    Required,
    #[sea_orm(string_value = "REQUIRED_VERIFIED_EMAIL")]
    RequiredVerifiedEmail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "kyc_status")]
pub enum KycStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "VERIFIED")]
    Verified,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "form_of_payment")]
pub enum FormOfPayment {
    #[sea_orm(string_value = "TRANSFER")]
    Transfer,
    #[sea_orm(string_value = "CARD")]
    Card,
    #[sea_orm(string_value = "CRYPTO")]
    Crypto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_status")]
pub enum TransactionStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "AWAITING_PAYMENT")]
    AwaitingPayment,
    #[sea_orm(string_value = "PAYMENT_SUBMITTED")]
    PaymentSubmitted,
    #[sea_orm(string_value = "PAYMENT_VERIFIED")]
    PaymentVerified,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

/// Maps a database enum and its domain twin both ways, variant by variant.
macro_rules! mirror_enum {
    ($db:ident, $domain:ident, [$($variant:ident),+ $(,)?]) => {
        impl From<$db> for $domain {
            fn from(value: $db) -> Self {
                match value {
                    $($db::$variant => Self::$variant,)+
                }
            }
        }

        impl From<$domain> for $db {
            fn from(value: $domain) -> Self {
                match value {
                    $($domain::$variant => Self::$variant,)+
                }
            }
        }
    };
}

mirror_enum!(SaleStatus, DomainSaleStatus, [Created, Open, Closed, Finished]);
mirror_enum!(SaftRequirement, DomainSaft, [NotRequired, Required, RequiredVerifiedEmail]);
mirror_enum!(KycStatus, DomainKycStatus, [Pending, Verified, Rejected]);
mirror_enum!(FormOfPayment, DomainFormOfPayment, [Transfer, Card, Crypto]);
mirror_enum!(
    TransactionStatus,
    DomainTransactionStatus,
    [
        Pending,
        AwaitingPayment,
        PaymentSubmitted,
        PaymentVerified,
        Completed,
        Rejected,
        Cancelled
    ]
);

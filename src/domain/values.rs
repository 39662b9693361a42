//! Text-backed enumerations
//!
//! Every status/type column is stored as text (as the rest of the schema
//! does) and converted through these enums at the model boundary.

use super::DomainError;

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident as $field:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(DomainError::UnknownValue {
                        field: $field,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

text_enum! {
    /// Account role. Superusers may have no role at all.
    Role as "role" {
        Seller => "seller",
        Manager => "manager",
    }
}

text_enum! {
    PhoneStatus as "phone status" {
        Available => "available",
        Sold => "sold",
        Assigned => "assigned",
    }
}

text_enum! {
    PhoneCondition as "phone condition" {
        New => "new",
        Used => "used",
        Other => "other",
    }
}

impl PhoneCondition {
    pub fn label(&self) -> &'static str {
        match self {
            PhoneCondition::New => "New",
            PhoneCondition::Used => "Used",
            PhoneCondition::Other => "Other",
        }
    }
}

text_enum! {
    AgreementType as "agreement type" {
        Buy => "buy",
        Sell => "sell",
    }
}

text_enum! {
    /// Append-only audit actions recorded against a phone.
    HistoryAction as "history action" {
        Buy => "buy",
        Sell => "sell",
        Assign => "assign",
        Approve => "approve",
        Reject => "reject",
    }
}

text_enum! {
    AssignmentStatus as "assignment status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

text_enum! {
    TransactionStatus as "transaction status" {
        Completed => "completed",
        Pending => "pending",
        Cancelled => "cancelled",
        Refunded => "refunded",
    }
}

text_enum! {
    PaymentMethod as "payment method" {
        Cash => "cash",
        MobileMoney => "mobile_money",
        BankTransfer => "bank_transfer",
        Credit => "credit",
        Other => "other",
    }
}

text_enum! {
    PeriodType as "period type" {
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
        Quarterly => "quarterly",
        Yearly => "yearly",
    }
}

text_enum! {
    TargetType as "target type" {
        SalesCount => "sales_count",
        Revenue => "revenue",
        Profit => "profit",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_round_trip_for_stored_values() {
        for status in PhoneStatus::ALL {
            assert_eq!(status.as_str().parse::<PhoneStatus>().unwrap(), *status);
        }
        assert_eq!(
            "mobile_money".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::MobileMoney
        );
    }

    #[test]
    fn test_unknown_value_names_the_field() {
        let err = "lost".parse::<PhoneStatus>().unwrap_err();
        assert_eq!(
            err,
            DomainError::UnknownValue {
                field: "phone status",
                value: "lost".to_string()
            }
        );
    }

    #[test]
    fn test_serde_uses_stored_text() {
        let json = serde_json::to_string(&TargetType::SalesCount).unwrap();
        assert_eq!(json, "\"sales_count\"");
    }
}

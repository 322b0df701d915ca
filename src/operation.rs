use std::{fmt, str::FromStr};

use chrono::Utc;
use rand::Rng;

use crate::error::{Error, Result};
use crate::response::FieldMapping;
use crate::soap::{Element, prefix};

/// Remote operations exposed by the payment service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    InitInscription,
    FinishInscription,
    RemoveUser,
    Authorize,
    Reverse,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::InitInscription,
        Operation::FinishInscription,
        Operation::RemoveUser,
        Operation::Authorize,
        Operation::Reverse,
    ];

    /// Element name used on the wire
    pub fn wire_name(self) -> &'static str {
        match self {
            Operation::InitInscription => "initInscription",
            Operation::FinishInscription => "finishInscription",
            Operation::RemoveUser => "removeUser",
            Operation::Authorize => "authorize",
            Operation::Reverse => "codeReverseOneClick",
        }
    }

    /// Required argument fields, in the order the service expects them
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Operation::InitInscription => &["username", "email", "responseURL"],
            Operation::FinishInscription => &["token"],
            Operation::RemoveUser => &["tbkUser", "username"],
            Operation::Authorize => &["buyOrder", "tbkUser", "username", "amount"],
            Operation::Reverse => &["buyorder"],
        }
    }

    /// Build the `ns1:<operation><arg0>…</arg0>` body payload.
    ///
    /// Fields not listed in [`Operation::fields`] are ignored.
    pub fn payload(self, fields: &FieldMapping) -> Result<Element> {
        let arguments = self.fields().iter().try_fold(
            Element::new("arg0"),
            |arg0, &name| match fields.get(name) {
                Some(value) => Ok(arg0.with_child(Element::new(name).with_text(value.as_str()))),
                None => Err(Error::MissingField {
                    operation: self.wire_name(),
                    field: name,
                }),
            },
        )?;

        Ok(
            Element::new(format!("{}:{}", prefix::ONECLICK, self.wire_name()))
                .with_child(arguments),
        )
    }

    /// Field carrying the caller's order id, if the operation has one
    pub fn order_field(self) -> Option<&'static str> {
        match self {
            Operation::Authorize => Some("buyOrder"),
            Operation::Reverse => Some("buyorder"),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Operation::ALL
            .into_iter()
            .find(|op| op.wire_name() == s)
            .ok_or_else(|| Error::UnknownOperation(s.to_owned()))
    }
}

/// A fresh order id: UTC timestamp followed by three random digits
pub fn generate_buy_order() -> String {
    let suffix = rand::rng().random_range(0..1000);
    format!("{}{suffix:03}", Utc::now().format("%Y%m%d%H%M%S"))
}

//! Syntax-neutral element tree.
//!
//! The document is lowered once; each syntax family only decides how an
//! aggregate and a leaf are spelled.

use super::model::{BalanceEntry, OutputDocument, Statement, StatementEntry};

/// A node of the OFX body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// Container with child elements.
    Aggregate {
        /// Tag name.
        name: &'static str,
        /// Children in order.
        children: Vec<Element>,
    },
    /// Tag with a text value.
    Leaf {
        /// Tag name.
        name: &'static str,
        /// Unescaped text.
        value: String,
    },
}

impl Element {
    fn aggregate(name: &'static str, children: Vec<Element>) -> Self {
        Self::Aggregate { name, children }
    }

    fn leaf(name: &'static str, value: impl Into<String>) -> Self {
        Self::Leaf { name, value: value.into() }
    }

    /// Tag name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aggregate { name, .. } | Self::Leaf { name, .. } => *name,
        }
    }

    /// Depth-first search for the first element named `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name() == name {
            return Some(self);
        }
        match self {
            Self::Aggregate { children, .. } => children.iter().find_map(|c| c.find(name)),
            Self::Leaf { .. } => None,
        }
    }
}

fn status() -> Element {
    Element::aggregate("STATUS", vec![Element::leaf("CODE", "0"), Element::leaf("SEVERITY", "INFO")])
}

fn balance(name: &'static str, entry: &BalanceEntry) -> Element {
    Element::aggregate(
        name,
        vec![Element::leaf("BALAMT", &entry.amount), Element::leaf("DTASOF", &entry.as_of)],
    )
}

fn transaction(entry: &StatementEntry) -> Element {
    let mut children = vec![
        Element::leaf("TRNTYPE", entry.trntype),
        Element::leaf("DTPOSTED", &entry.posted),
        Element::leaf("DTUSER", &entry.user_date),
        Element::leaf("TRNAMT", &entry.amount),
        Element::leaf("FITID", &entry.fitid),
    ];
    if let Some(name) = &entry.name {
        children.push(Element::leaf("NAME", name));
    }
    if let Some(memo) = &entry.memo {
        children.push(Element::leaf("MEMO", memo));
    }
    Element::aggregate("STMTTRN", children)
}

fn statement(stmt: &Statement) -> Element {
    let mut tranlist =
        vec![Element::leaf("DTSTART", &stmt.start), Element::leaf("DTEND", &stmt.end)];
    tranlist.extend(stmt.entries.iter().map(transaction));

    let mut stmtrs = vec![
        Element::leaf("CURDEF", &stmt.currency),
        Element::aggregate(
            "BANKACCTFROM",
            vec![
                Element::leaf("BANKID", &stmt.bank_id),
                Element::leaf("ACCTID", &stmt.account_id),
                Element::leaf("ACCTTYPE", stmt.account_type.as_str()),
            ],
        ),
        Element::aggregate("BANKTRANLIST", tranlist),
    ];
    if let Some(ledger) = &stmt.ledger {
        stmtrs.push(balance("LEDGERBAL", ledger));
    }
    if let Some(available) = &stmt.available {
        stmtrs.push(balance("AVAILBAL", available));
    }

    Element::aggregate(
        "STMTTRNRS",
        vec![Element::leaf("TRNUID", &stmt.trnuid), status(), Element::aggregate("STMTRS", stmtrs)],
    )
}

impl From<&OutputDocument> for Element {
    fn from(doc: &OutputDocument) -> Self {
        let mut fi = Vec::with_capacity(2);
        if let Some(org) = &doc.signon.org {
            fi.push(Element::leaf("ORG", org));
        }
        fi.push(Element::leaf("FID", &doc.signon.fi_id));

        let sonrs = Element::aggregate(
            "SONRS",
            vec![
                status(),
                Element::leaf("DTSERVER", &doc.signon.server_time),
                Element::leaf("LANGUAGE", doc.signon.language),
                Element::leaf("DTPROFUP", &doc.signon.profile_updated),
                Element::leaf("DTACCTUP", &doc.signon.account_updated),
                Element::aggregate("FI", fi),
            ],
        );

        Element::aggregate(
            "OFX",
            vec![
                Element::aggregate("SIGNONMSGSRSV1", vec![sonrs]),
                Element::aggregate("BANKMSGSRSV1", vec![statement(&doc.statement)]),
            ],
        )
    }
}

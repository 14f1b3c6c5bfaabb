use hstorage::aggregate::Aggregate;
use hstorage::entity::Entity;
use hstorage_macros::aggregate;

#[aggregate(tag = "account", collection = "accounts")]
#[derive(Clone, PartialEq)]
struct Account {
    name: String,
}

#[aggregate]
struct OrderLine {
    quantity: u32,
}

fn main() {
    let account = Account {
        id: "a-1".to_string(),
        name: "Van".to_string(),
    };
    assert_eq!(account.id(), "a-1");
    assert_eq!(Account::TYPE, "account");
    assert_eq!(Account::COLLECTION, Some("accounts"));
    assert_eq!(account.clone(), account);

    assert_eq!(OrderLine::TYPE, "order_line");
    assert_eq!(OrderLine::COLLECTION, None);
    let _ = format!("{:?}", OrderLine::default());
}

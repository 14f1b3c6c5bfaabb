use hstorage::entity::Entity;
use hstorage_macros::entity;

#[entity(debug = false)]
struct Secret {
    token: String,
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret({}, ..)", self.id)
    }
}

fn main() {
    let secret = Secret {
        id: "s-1".to_string(),
        token: "hidden".to_string(),
    };
    assert_eq!(secret.id(), "s-1");
    assert_eq!(format!("{:?}", secret), "Secret(s-1, ..)");
}

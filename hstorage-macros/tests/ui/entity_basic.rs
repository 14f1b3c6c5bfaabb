use hstorage::entity::Entity;
use hstorage_macros::entity;

#[entity]
struct Profile {
    nickname: String,
}

#[entity(id = u64)]
struct Ticket {
    title: String,
}

// 已声明的 id 字段会被移至最前并保留原类型
#[entity]
struct Note {
    body: String,
    id: i64,
}

fn main() {
    let profile = Profile::default();
    assert_eq!(profile.id(), "");

    let ticket = Ticket {
        id: 7,
        title: "t".into(),
    };
    assert_eq!(*ticket.id(), 7);
    assert_eq!(ticket.identity(), "7");

    let note = Note { id: -1, body: String::new() };
    assert_eq!(note.identity(), "-1");
}

use anyhow::Result as AnyResult;
use chrono::{SubsecRound, TimeDelta, TimeZone, Timelike, Utc};
use hstorage::aggregate::Aggregate;
use hstorage::clock::{Clock, FixedClock};
use hstorage::error::{MappingConfigurationError, MappingError, StorageError};
use hstorage::mapping::{MappingConfigurer, ModelMapping};
use hstorage::persist::{AggregateState, InMemoryStatePersister, StatePersister};
use hstorage::storage::Storage;
use hstorage_macros::aggregate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[aggregate(tag = "entity")]
#[derive(Clone, PartialEq)]
struct Entity {
    name: String,
}

#[aggregate(tag = "aggregate", collection = "test_aggregates")]
#[derive(Clone, PartialEq)]
struct TestAggregate {
    name: String,
    tags: Vec<String>,
    visits: u32,
}

#[aggregate(tag = "car", collection = "vehicles")]
#[derive(Clone, PartialEq)]
struct Car {
    seats: u8,
}

#[aggregate(tag = "truck", collection = "vehicles")]
#[derive(Clone, PartialEq)]
struct Truck {
    payload_kg: u32,
}

#[derive(Debug, Clone, PartialEq)]
enum Vehicle {
    Car(Car),
    Truck(Truck),
}

impl From<Car> for Vehicle {
    fn from(car: Car) -> Self {
        Vehicle::Car(car)
    }
}

impl From<Truck> for Vehicle {
    fn from(truck: Truck) -> Self {
        Vehicle::Truck(truck)
    }
}

/// 与 `Entity` 同样落在默认集合
#[aggregate(tag = "person")]
#[derive(Clone, PartialEq)]
struct Person {
    name: String,
    age: u32,
}

#[aggregate(tag = "member", collection = "members")]
#[derive(Clone, PartialEq)]
struct Member {
    name: String,
    age: u32,
}

/// 未注册到映射中的类型
#[aggregate(tag = "stray")]
struct Stray {
    name: String,
}

/// 手动实现，标识字段被跳过序列化
#[derive(Debug, Default, Serialize, Deserialize)]
struct TypeWithoutIdField {
    #[serde(skip)]
    id: String,
    name: String,
}

impl hstorage::entity::Entity for TypeWithoutIdField {
    type Id = String;
    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Aggregate for TypeWithoutIdField {
    const TYPE: &'static str = "without_id";
}

struct Fixture {
    storage: Storage<InMemoryStatePersister>,
    persister: Arc<InMemoryStatePersister>,
    clock: FixedClock,
}

fn mapping() -> ModelMapping {
    MappingConfigurer::new()
        .register::<Entity>()
        .register::<TestAggregate>()
        .register_subtype::<Vehicle, Car>()
        .register_subtype::<Vehicle, Truck>()
        .configure()
        .expect("mapping should configure")
}

fn fixture() -> Fixture {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap());
    let persister = Arc::new(InMemoryStatePersister::new());
    let storage = Storage::new(Arc::new(mapping()), Arc::clone(&persister), Arc::new(clock));
    Fixture {
        storage,
        persister,
        clock,
    }
}

fn van() -> Entity {
    Entity {
        id: "0001".to_string(),
        name: "Van".to_string(),
    }
}

#[tokio::test]
async fn should_save_entity_state_with_fixed_timestamp() -> AnyResult<()> {
    let f = fixture();
    f.storage.save(&van()).await?;

    let rows = f.persister.rows("entities");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id(), "0001");
    assert_eq!(rows[0].content(), r#"{"id":"0001","name":"Van"}"#);
    assert_eq!(rows[0].timestamp(), f.clock.now());
    Ok(())
}

#[tokio::test]
async fn should_load_entity_state_field_by_field() -> AnyResult<()> {
    let f = fixture();
    let entity = van();
    f.storage.save(&entity).await?;

    let loaded: Entity = f.storage.load("0001").await?;
    assert_eq!(loaded, entity);
    Ok(())
}

#[tokio::test]
async fn should_round_trip_aggregate_in_own_collection() -> AnyResult<()> {
    let f = fixture();
    let aggregate = TestAggregate {
        id: ulid::Ulid::new().to_string(),
        name: "Van".to_string(),
        tags: vec!["a".into(), "b".into()],
        visits: 3,
    };
    f.storage.save(&aggregate).await?;

    assert!(f.persister.rows("entities").is_empty());
    assert_eq!(f.persister.rows("test_aggregates").len(), 1);

    let id = f.storage.mapping().extract_identity(&aggregate)?;
    let loaded: TestAggregate = f.storage.load(&id).await?;
    assert_eq!(loaded, aggregate);
    Ok(())
}

#[tokio::test]
async fn should_overwrite_existing_state_on_second_save() -> AnyResult<()> {
    let f = fixture();
    f.storage.save(&van()).await?;
    let renamed = Entity {
        id: "0001".to_string(),
        name: "Vanessa".to_string(),
    };
    f.storage.save(&renamed).await?;

    let rows = f.persister.rows("entities");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].content(), r#"{"id":"0001","name":"Vanessa"}"#);

    let loaded: Entity = f.storage.load("0001").await?;
    assert_eq!(loaded, renamed);
    Ok(())
}

#[tokio::test]
async fn should_reject_unregistered_type() {
    let f = fixture();
    let stray = Stray {
        id: "s-1".to_string(),
        name: "Van".to_string(),
    };

    let err = f.storage.save(&stray).await.unwrap_err();
    match &err {
        StorageError::Mapping(MappingError::MissingIdentity { type_name, field }) => {
            assert!(type_name.ends_with("Stray"));
            assert_eq!(*field, "id");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(err.to_string().starts_with("Missing 'id' field in type '"));
    assert!(f.persister.is_empty());
}

#[tokio::test]
async fn should_reject_entities_without_id_field() {
    let clock = FixedClock::new(Utc::now());
    let persister = Arc::new(InMemoryStatePersister::new());
    // 注册期探测会拒绝该类型，这里绕过注册以模拟运行期缺失
    let mapping = MappingConfigurer::new().register::<Entity>().configure().unwrap();
    let storage = Storage::new(Arc::new(mapping), Arc::clone(&persister), Arc::new(clock));

    let object = TypeWithoutIdField {
        id: "w-1".to_string(),
        name: "Van".to_string(),
    };
    let err = storage.save(&object).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "Missing 'id' field in type '{}'!",
            std::any::type_name::<TypeWithoutIdField>()
        )
    );
    assert!(persister.is_empty());
}

#[tokio::test]
async fn should_throw_aggregate_not_found_while_loading_missing_id() {
    let f = fixture();
    let err = f.storage.load::<Entity>("missing").await.unwrap_err();
    assert!(err.is_not_found());
    match &err {
        StorageError::AggregateNotFound { id, type_name } => {
            assert_eq!(id, "missing");
            assert!(type_name.ends_with("Entity"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        format!(
            "Aggregate 'missing' of type '{}' does not exist!",
            std::any::type_name::<Entity>()
        )
    );

    assert!(f.storage.find::<Entity>("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn should_resolve_subtype_when_loading_by_base_type() -> AnyResult<()> {
    let f = fixture();
    let truck = Truck {
        id: "v-2".to_string(),
        payload_kg: 1200,
    };
    f.storage.save(&truck).await?;

    let rows = f.persister.rows("vehicles");
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].content(),
        r#"{"id":"v-2","payload_kg":1200,"@type":"truck"}"#
    );

    let loaded: Vehicle = f.storage.load("v-2").await?;
    assert_eq!(loaded, Vehicle::Truck(truck.clone()));

    // 仍可按具体类型加载
    let concrete: Truck = f.storage.load("v-2").await?;
    assert_eq!(concrete, truck);
    Ok(())
}

#[tokio::test]
async fn should_reject_cross_hierarchy_load() -> AnyResult<()> {
    let f = fixture();
    f.storage
        .save(&Car {
            id: "v-1".to_string(),
            seats: 4,
        })
        .await?;

    let err = f.storage.load::<Truck>("v-1").await.unwrap_err();
    match err {
        StorageError::Mapping(MappingError::NotAssignable {
            expected,
            field,
            found,
        }) => {
            assert_eq!(field, "@type");
            assert!(expected.ends_with("Truck"));
            assert!(found.ends_with("Car"));
        }
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn should_fail_on_unknown_tag_in_stored_content() -> AnyResult<()> {
    let f = fixture();
    f.persister
        .upsert(
            &AggregateState::builder()
                .collection("vehicles")
                .id("v-9")
                .content(r#"{"id":"v-9","wings":2,"@type":"plane"}"#)
                .timestamp(f.clock.now())
                .build(),
        )
        .await?;

    let err = f.storage.load::<Vehicle>("v-9").await.unwrap_err();
    match err {
        StorageError::Mapping(MappingError::UnknownTypeTag { tag, .. }) => assert_eq!(tag, "plane"),
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn should_decode_untagged_content_as_expected_type() -> AnyResult<()> {
    let f = fixture();
    f.persister
        .upsert(
            &AggregateState::builder()
                .collection("vehicles")
                .id("v-3")
                .content(r#"{"id":"v-3","seats":2}"#)
                .timestamp(f.clock.now())
                .build(),
        )
        .await?;

    let car: Car = f.storage.load("v-3").await?;
    assert_eq!(car.seats, 2);

    let err = f.storage.load::<Vehicle>("v-3").await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Mapping(MappingError::MissingTypeTag { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn should_surface_malformed_content_as_serde_error() -> AnyResult<()> {
    let f = fixture();
    f.persister
        .upsert(
            &AggregateState::builder()
                .collection("entities")
                .id("broken")
                .content(r#"{"id":"broken","name":42}"#)
                .timestamp(f.clock.now())
                .build(),
        )
        .await?;

    let err = f.storage.load::<Entity>("broken").await.unwrap_err();
    assert!(matches!(err, StorageError::Serde { .. }));
    Ok(())
}

#[tokio::test]
async fn should_reject_loading_unregistered_type() {
    let f = fixture();
    let err = f.storage.load::<Stray>("s-1").await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Mapping(MappingError::UnregisteredType { .. })
    ));
}

#[tokio::test]
async fn concurrent_saves_to_same_id_leave_single_row() -> AnyResult<()> {
    let f = fixture();
    let storage = f.storage.clone();

    let mut handles = Vec::new();
    for i in 0..8u32 {
        let storage = storage.clone();
        handles.push(tokio::spawn(async move {
            storage
                .save(&Entity {
                    id: "0001".to_string(),
                    name: format!("writer-{i}"),
                })
                .await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let rows = f.persister.rows("entities");
    assert_eq!(rows.len(), 1);
    let loaded: Entity = f.storage.load("0001").await?;
    assert!(loaded.name.starts_with("writer-"));
    Ok(())
}

#[test]
fn unrelated_types_in_default_collection_are_rejected() {
    let err = MappingConfigurer::new()
        .register::<Entity>()
        .register::<Person>()
        .configure()
        .unwrap_err();
    match err {
        MappingConfigurationError::SharedCollection {
            collection,
            first,
            second,
        } => {
            assert_eq!(collection, "entities");
            assert!(first.ends_with("Entity"));
            assert!(second.ends_with("Person"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn same_id_in_separate_collections_keeps_both_rows() -> AnyResult<()> {
    let persister = Arc::new(InMemoryStatePersister::new());
    let mapping = MappingConfigurer::new()
        .register::<Entity>()
        .register::<Member>()
        .configure()?;
    let storage = Storage::with_system_clock(Arc::new(mapping), Arc::clone(&persister));

    let entity = Entity {
        id: "1".to_string(),
        name: "Van".to_string(),
    };
    let member = Member {
        id: "1".to_string(),
        name: "Bob".to_string(),
        age: 40,
    };
    storage.save(&entity).await?;
    storage.save(&member).await?;

    assert_eq!(persister.len(), 2);
    let loaded: Entity = storage.load("1").await?;
    assert_eq!(loaded, entity);
    let loaded: Member = storage.load("1").await?;
    assert_eq!(loaded, member);
    Ok(())
}

#[tokio::test]
async fn should_store_timestamp_at_microsecond_precision() -> AnyResult<()> {
    let instant = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap()
        + TimeDelta::nanoseconds(123_456_789);
    let clock = FixedClock::new(instant);
    let persister = Arc::new(InMemoryStatePersister::new());
    let storage = Storage::new(Arc::new(mapping()), Arc::clone(&persister), Arc::new(clock));

    storage.save(&van()).await?;

    let rows = persister.rows("entities");
    assert_eq!(rows[0].timestamp(), instant.trunc_subsecs(6));
    assert_eq!(rows[0].timestamp().nanosecond(), 123_456_000);
    Ok(())
}

#[tokio::test]
async fn should_reject_empty_identity() {
    let f = fixture();
    let err = f.storage.save(&Entity::default()).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Mapping(MappingError::EmptyIdentity { field: "id", .. })
    ));
    assert!(f.persister.is_empty());
}

/// 多态存储示例
/// 演示以层级根类型（枚举）加载时，依据内容中的 `@type` 标签解析出具体子类型
use anyhow::Result as AnyResult;
use hstorage::mapping::MappingConfigurer;
use hstorage::persist::InMemoryStatePersister;
use hstorage::storage::Storage;
use hstorage_macros::aggregate;
use std::sync::Arc;

#[aggregate(tag = "circle", collection = "shapes")]
#[derive(Clone, PartialEq)]
struct Circle {
    radius: f64,
}

#[aggregate(tag = "rectangle", collection = "shapes")]
#[derive(Clone, PartialEq)]
struct Rectangle {
    width: f64,
    height: f64,
}

#[derive(Debug, Clone, PartialEq)]
enum Shape {
    Circle(Circle),
    Rectangle(Rectangle),
}

impl Shape {
    fn area(&self) -> f64 {
        match self {
            Shape::Circle(c) => std::f64::consts::PI * c.radius * c.radius,
            Shape::Rectangle(r) => r.width * r.height,
        }
    }
}

impl From<Circle> for Shape {
    fn from(circle: Circle) -> Self {
        Shape::Circle(circle)
    }
}

impl From<Rectangle> for Shape {
    fn from(rectangle: Rectangle) -> Self {
        Shape::Rectangle(rectangle)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> AnyResult<()> {
    let mapping = MappingConfigurer::new()
        .register_subtype::<Shape, Circle>()
        .register_subtype::<Shape, Rectangle>()
        .configure()?;
    let persister = Arc::new(InMemoryStatePersister::new());
    let storage = Storage::with_system_clock(Arc::new(mapping), Arc::clone(&persister));

    storage
        .save(&Circle {
            id: "shape-1".to_string(),
            radius: 1.5,
        })
        .await?;
    storage
        .save(&Rectangle {
            id: "shape-2".to_string(),
            width: 2.0,
            height: 3.0,
        })
        .await?;

    println!("=== 存储内容 ===");
    for row in persister.rows("shapes") {
        println!("{} @ {}: {}", row.id(), row.timestamp(), row.content());
    }

    println!("\n=== 以 Shape 加载 ===");
    for id in ["shape-1", "shape-2"] {
        let shape: Shape = storage.load(id).await?;
        println!("{id}: {shape:?}, area = {:.2}", shape.area());
    }

    match storage.load::<Shape>("shape-3").await {
        Err(err) if err.is_not_found() => println!("\n{err}"),
        other => println!("\nunexpected: {other:?}"),
    }

    Ok(())
}

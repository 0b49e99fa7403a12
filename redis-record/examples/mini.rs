use redis_record::{Error, Record, RecordStore, RedisStore};

#[derive(Record, Clone, Debug, PartialEq)]
#[record(name = "user", key = "user_id", prefix = "MY_REDIS_MODEL")]
pub struct UserInfo {
    pub user_id: i64,

    #[index(unique)]
    pub name: String,

    #[index(set)]
    pub age: i32,

    #[index(queue)]
    pub team: Option<String>,

    pub email: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();

    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
    let mut store = RedisStore::connect(&url).await?;

    redis_record::drop_all(&mut store).await?;

    for (user_id, name) in [(1, "Alice"), (2, "Bob")] {
        UserInfo {
            user_id,
            name: name.to_string(),
            age: 25,
            team: Some("red".to_string()),
            email: format!("{}@example.com", name.to_lowercase()),
        }
        .save_dedup(&mut store)
        .await?;
    }

    let a = UserInfo::query().name("Alice").one(&mut store).await?;
    println!("{:?}", a);

    let b = UserInfo::query().age(25).all(&mut store).await?;
    println!("{:?}", b);

    let next = UserInfo::query().team("red").rotate(&mut store).await?;
    println!("{:?}", next);

    if let Some(a) = a {
        a.delete(&mut store).await?;
    }

    Ok(())
}

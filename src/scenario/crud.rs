//! CRUD consistency.
//!
//! Create an item, then repeatedly mutate a random subset of its fields,
//! update it under its previous name and fetch it under its new name. After
//! every update the stored item must equal the local copy, including the id
//! the service assigned on creation.

use serde_json::Value;

use crate::client::SessionClient;
use crate::error::Result;
use crate::oracle;
use crate::scenario::Session;

pub async fn run(session: &mut Session<'_>) -> Result<()> {
    let config = session.config;
    let mut client = SessionClient::new(config)?;
    let mut item = session.generator.item();

    let res = client.post_json("add item", "/add", &item).await?;
    session.verifier.check("add item", &oracle::item_added(), &res);

    let res = client
        .get("find item", &format!("/find/{}", item.name))
        .await?;
    item.id = Some(res.pointer("/item/id").cloned().unwrap_or(Value::Null));
    session
        .verifier
        .check("find created item", &oracle::item_found(&item), &res);

    for round in 1..=config.iterations {
        let old_name = item.name.clone();
        session.generator.mutate_item(&mut item);

        let res = client
            .post_json("update item", &format!("/update/{}", old_name), &item)
            .await?;
        session.verifier.check(
            &format!("update #{}", round),
            &oracle::item_updated(),
            &res,
        );

        let res = client
            .get("find item", &format!("/find/{}", item.name))
            .await?;
        session.verifier.check(
            &format!("find after update #{}", round),
            &oracle::item_found(&item),
            &res,
        );
    }

    Ok(())
}

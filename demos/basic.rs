use overpass_http::{OverpassClient, RequestOverrides};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = OverpassClient::from_env().map_err(anyhow::Error::msg)?;

    let status = client.api_status().await?;
    println!(
        "client {:?}: rate limit {}, {} running, {} waiting",
        status.client_id,
        status.rate_limit,
        status.slots_running.len(),
        status.slots_available_after.len()
    );

    let document = client
        .query_json_with(
            "[out:json][timeout:25];node[amenity=drinking_water](51.50,-0.13,51.51,-0.12);out;",
            &RequestOverrides::default().num_retries(3).verbose(true),
        )
        .await?;

    if let Some(elements) = document["elements"].as_array() {
        for element in elements {
            println!("{} {}", element["id"], element["tags"]);
        }
    }

    Ok(())
}

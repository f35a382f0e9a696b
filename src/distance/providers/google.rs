use std::sync::Arc;

use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::domain::Location;
use crate::error::OptimizerError;

const FACTOR: usize = 10;

/// Fetches a full distance (km) and duration (minutes) matrix for
/// `locations` from the Google Distance Matrix API. A single attempt; the
/// caller is responsible for retry/backoff.
pub async fn fetch(
    locations: &[Location],
    api_key: &str,
) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>), OptimizerError> {
    let n = locations.len();
    if n == 0 {
        return Ok((Vec::new(), Vec::new()));
    }

    let client = Arc::new(Client::new());
    let (padded, page_count) = pad_locations(locations);

    let mut tasks = Vec::new();
    for page_col in 0..page_count {
        let destinations = padded[page_col * FACTOR..(page_col + 1) * FACTOR].to_vec();
        for page_row in 0..page_count {
            let origins = padded[page_row * FACTOR..(page_row + 1) * FACTOR].to_vec();
            let client = Arc::clone(&client);
            let api_key = api_key.to_string();
            tasks.push(tokio::task::spawn(async move {
                fetch_page(client, &origins, &destinations, &api_key).await
            }));
        }
    }

    let pages = join_all(tasks).await;
    let mut distance_rows: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut pages = pages.into_iter();

    for _page_col in 0..page_count {
        let mut column_rows: Vec<Vec<(f64, f64)>> = Vec::new();
        for _page_row in 0..page_count {
            let page = pages
                .next()
                .expect("page grid iterator exhausted before page_count^2 entries")
                .map_err(|e| OptimizerError::ProviderUnavailable(format!("google task join: {e}")))??;
            column_rows.extend(page);
        }
        if distance_rows.is_empty() {
            distance_rows = column_rows;
        } else {
            for (row, extra) in distance_rows.iter_mut().zip(column_rows) {
                row.extend(extra);
            }
        }
    }

    distance_rows.truncate(n);
    for row in distance_rows.iter_mut() {
        row.truncate(n);
    }

    let mut distance_km = vec![vec![0.0; n]; n];
    let mut time_min = vec![vec![0.0; n]; n];
    for (i, row) in distance_rows.into_iter().enumerate() {
        for (j, (dist, dur)) in row.into_iter().enumerate() {
            distance_km[i][j] = dist;
            time_min[i][j] = dur;
        }
    }

    Ok((distance_km, time_min))
}

fn pad_locations(locations: &[Location]) -> (Vec<Location>, usize) {
    let mut padded = locations.to_vec();
    let remainder = locations.len() % FACTOR;
    if remainder > 0 {
        let filler = locations[0].clone();
        padded.extend(std::iter::repeat(filler).take(FACTOR - remainder));
    }
    let page_count = padded.len() / FACTOR;
    (padded, page_count)
}

async fn fetch_page(
    client: Arc<Client>,
    origins: &[Location],
    destinations: &[Location],
    api_key: &str,
) -> Result<Vec<Vec<(f64, f64)>>, OptimizerError> {
    let base_url = "https://maps.googleapis.com/maps/api/distancematrix/json";
    let origins_param = origins
        .iter()
        .map(|l| format!("{},{}", l.latitude, l.longitude))
        .collect::<Vec<_>>()
        .join("|");
    let destinations_param = destinations
        .iter()
        .map(|l| format!("{},{}", l.latitude, l.longitude))
        .collect::<Vec<_>>()
        .join("|");
    let url = format!(
        "{base_url}?origins={origins_param}&destinations={destinations_param}&key={api_key}"
    );

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| OptimizerError::ProviderUnavailable(format!("google request: {e}")))?;

    if !response.status().is_success() {
        return Err(OptimizerError::ProviderUnavailable(format!(
            "google returned HTTP {}",
            response.status()
        )));
    }

    let parsed = response
        .json::<DistanceMatrixResponse>()
        .await
        .map_err(|e| OptimizerError::ProviderUnavailable(format!("google response: {e}")))?;

    if parsed.status != "OK" {
        return Err(OptimizerError::ProviderUnavailable(format!(
            "google status: {}",
            parsed.status
        )));
    }

    let mut page = Vec::with_capacity(parsed.rows.len());
    for row in parsed.rows {
        let mut row_data = Vec::with_capacity(row.elements.len());
        for element in row.elements {
            if element.status != "OK" {
                warn!("google element status {}: treating as unreachable", element.status);
                row_data.push((f64::INFINITY, f64::INFINITY));
                continue;
            }
            let dist_km = element.distance.map(|d| d.value as f64 / 1000.0).unwrap_or(f64::INFINITY);
            let dur_min = element.duration.map(|d| d.value as f64 / 60.0).unwrap_or(f64::INFINITY);
            row_data.push((dist_km, dur_min));
        }
        page.push(row_data);
    }
    Ok(page)
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    status: String,
    distance: Option<Distance>,
    duration: Option<Duration>,
}

#[derive(Debug, Deserialize)]
struct Distance {
    value: i64,
}

#[derive(Debug, Deserialize)]
struct Duration {
    value: i64,
}

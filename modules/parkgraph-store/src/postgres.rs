// Postgres-backed DocumentStore. One table per collection; canonical fields
// are columns, everything else rides along in `extra`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use parkgraph_common::{
    Collection, DistinctField, District, GeoPoint, NormalizedDocument, PointGeometry,
    SearchFilters,
};

use crate::error::Result;
use crate::schema::{index_ddl, table_ddl};
use crate::store::DocumentStore;

const COLUMNS: &str = "id, district, regulation, spot_type, zone, street, place_count, surface, \
                       signage, survey_date, lat, lon, location, loaded_at, extra";

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

/// A row from either collection table.
#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    district: Option<i16>,
    regulation: Option<String>,
    spot_type: Option<String>,
    zone: Option<String>,
    street: Option<String>,
    place_count: Option<i64>,
    surface: Option<f64>,
    signage: Option<String>,
    survey_date: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    location: Option<Json<PointGeometry>>,
    loaded_at: DateTime<Utc>,
    extra: Json<Map<String, Value>>,
}

impl From<DocumentRow> for NormalizedDocument {
    fn from(row: DocumentRow) -> Self {
        let geo_point = match (row.lat, row.lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        };
        Self {
            id: row.id,
            district: row.district.and_then(|d| District::new(i64::from(d))),
            regulation: row.regulation,
            spot_type: row.spot_type,
            zone: row.zone,
            street: row.street,
            place_count: row.place_count,
            surface: row.surface,
            signage: row.signage,
            survey_date: row.survey_date,
            geo_point,
            location: row.location.map(|Json(g)| g),
            loaded_at: row.loaded_at,
            extra: row.extra.0,
        }
    }
}

impl PgDocumentStore {
    /// Open a pool against `database_url`. Fails fast if Postgres is unreachable.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Close every pooled connection. Further calls will fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn clear(&self, collection: Collection) -> Result<u64> {
        let result = sqlx::query(&format!("DELETE FROM {}", collection.table()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_many(
        &self,
        collection: Collection,
        docs: &[NormalizedDocument],
    ) -> Result<u64> {
        if docs.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {} ({COLUMNS}) ", collection.table()));
        qb.push_values(docs, |mut b, doc| {
            b.push_bind(doc.id.clone())
                .push_bind(doc.district.map(|d| i16::from(d.number())))
                .push_bind(doc.regulation.clone())
                .push_bind(doc.spot_type.clone())
                .push_bind(doc.zone.clone())
                .push_bind(doc.street.clone())
                .push_bind(doc.place_count)
                .push_bind(doc.surface)
                .push_bind(doc.signage.clone())
                .push_bind(doc.survey_date.clone())
                .push_bind(doc.geo_point.map(|p| p.lat))
                .push_bind(doc.geo_point.map(|p| p.lon))
                .push_bind(doc.location.clone().map(Json))
                .push_bind(doc.loaded_at)
                .push_bind(Json(doc.extra.clone()));
        });

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn create_indexes(&self) -> Result<()> {
        for collection in [Collection::Footprints, Collection::Spots] {
            sqlx::query(&table_ddl(collection)).execute(&self.pool).await?;
            for ddl in index_ddl(collection) {
                sqlx::query(&ddl).execute(&self.pool).await?;
            }
        }
        info!("Document store tables and indexes ready");
        Ok(())
    }

    async fn search(
        &self,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<NormalizedDocument>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM spots WHERE TRUE"));

        if let Some(district) = filters.district {
            qb.push(" AND district = ").push_bind(district);
        }
        if let Some(zone) = &filters.zone {
            qb.push(" AND zone = ").push_bind(zone.clone());
        }
        for (column, needle) in [
            ("regulation", &filters.regulation),
            ("spot_type", &filters.spot_type),
            ("street", &filters.street),
        ] {
            if let Some(needle) = needle {
                qb.push(format!(" AND strpos(lower({column}), lower("))
                    .push_bind(needle.clone())
                    .push(")) > 0");
            }
        }

        qb.push(" ORDER BY pk LIMIT ").push_bind(limit as i64);

        let rows = qb
            .build_query_as::<DocumentRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(NormalizedDocument::from).collect())
    }

    async fn documents_with_coordinates(&self) -> Result<Vec<NormalizedDocument>> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {COLUMNS} FROM spots WHERE lat IS NOT NULL AND lon IS NOT NULL ORDER BY pk"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(NormalizedDocument::from).collect())
    }

    async fn all_documents(&self, collection: Collection) -> Result<Vec<NormalizedDocument>> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {COLUMNS} FROM {} ORDER BY pk",
            collection.table()
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(NormalizedDocument::from).collect())
    }

    async fn distinct_values(&self, field: DistinctField) -> Result<Vec<String>> {
        let column = field.column();
        // Text columns sort bytewise so results don't depend on the server locale.
        let order = match field {
            DistinctField::District => "t.v",
            _ => "t.v COLLATE \"C\"",
        };
        let values = sqlx::query_scalar::<_, String>(&format!(
            "SELECT t.v::text FROM (SELECT DISTINCT {column} AS v FROM spots \
             WHERE {column} IS NOT NULL) t ORDER BY {order}"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(values)
    }

    async fn count(&self, collection: Collection) -> Result<u64> {
        let n = sqlx::query_scalar::<_, i64>(&format!("SELECT count(*) FROM {}", collection.table()))
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }
}

// DDL for the document collections. Every statement is idempotent.

use parkgraph_common::Collection;

pub(crate) fn table_ddl(collection: Collection) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            pk          BIGSERIAL         PRIMARY KEY,
            id          TEXT              NOT NULL,
            district    SMALLINT          CHECK (district BETWEEN 1 AND 20),
            regulation  TEXT,
            spot_type   TEXT,
            zone        TEXT,
            street      TEXT,
            place_count BIGINT,
            surface     DOUBLE PRECISION,
            signage     TEXT,
            survey_date TEXT,
            lat         DOUBLE PRECISION,
            lon         DOUBLE PRECISION,
            location    JSONB,
            loaded_at   TIMESTAMPTZ       NOT NULL,
            extra       JSONB             NOT NULL DEFAULT '{{}}'::jsonb
        )
        "#,
        table = collection.table()
    )
}

pub(crate) fn index_ddl(collection: Collection) -> Vec<String> {
    let t = collection.table();
    let mut statements = vec![
        format!("CREATE INDEX IF NOT EXISTS {t}_id_idx ON {t} (id)"),
        format!("CREATE INDEX IF NOT EXISTS {t}_district_idx ON {t} (district)"),
        format!("CREATE INDEX IF NOT EXISTS {t}_regulation_idx ON {t} (regulation)"),
        format!("CREATE INDEX IF NOT EXISTS {t}_spot_type_idx ON {t} (spot_type)"),
        format!("CREATE INDEX IF NOT EXISTS {t}_zone_idx ON {t} (zone)"),
        format!(
            "CREATE INDEX IF NOT EXISTS {t}_location_idx ON {t} USING gist (point(lon, lat)) \
             WHERE location IS NOT NULL"
        ),
        format!("CREATE INDEX IF NOT EXISTS {t}_district_regulation_idx ON {t} (district, regulation)"),
        format!("CREATE INDEX IF NOT EXISTS {t}_survey_date_idx ON {t} (survey_date DESC)"),
    ];

    // Street-name text search only matters for the spot collection.
    if collection == Collection::Spots {
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS {t}_street_text_idx ON {t} \
             USING gin (to_tsvector('simple', coalesce(street, '')))"
        ));
    }

    statements
}

//! SQL query constants
//!
//! Contains all SQL used against the metadata store.

/// Idempotent DDL for the metadata tables, in dependency order
pub const CREATE_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS project (
        id SERIAL PRIMARY KEY,
        display_name VARCHAR(255) NOT NULL,
        connection_string VARCHAR(1024) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS model (
        id SERIAL PRIMARY KEY,
        project_id INTEGER NOT NULL REFERENCES project(id) ON DELETE CASCADE,
        source_table_name VARCHAR(255) NOT NULL,
        reference_name VARCHAR(255) NOT NULL,
        display_name VARCHAR(255) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS model_column (
        id SERIAL PRIMARY KEY,
        model_id INTEGER NOT NULL REFERENCES model(id) ON DELETE CASCADE,
        source_column_name VARCHAR(255) NOT NULL,
        reference_name VARCHAR(255) NOT NULL,
        display_name VARCHAR(255) NOT NULL,
        type VARCHAR(255) NOT NULL,
        is_calculated BOOLEAN NOT NULL DEFAULT false,
        lineage JSONB,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    // No ON DELETE CASCADE: relationships must be removed before their columns
    r#"
    CREATE TABLE IF NOT EXISTS relation (
        id SERIAL PRIMARY KEY,
        project_id INTEGER NOT NULL REFERENCES project(id) ON DELETE CASCADE,
        name VARCHAR(255) NOT NULL,
        from_column_id INTEGER NOT NULL REFERENCES model_column(id),
        to_column_id INTEGER NOT NULL REFERENCES model_column(id),
        join_type VARCHAR(32) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS schema_change (
        id SERIAL PRIMARY KEY,
        project_id INTEGER NOT NULL REFERENCES project(id) ON DELETE CASCADE,
        change JSONB NOT NULL,
        resolve JSONB NOT NULL,
        checksum VARCHAR(64) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_model_project_id ON model(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_model_column_model_id ON model_column(model_id)",
    "CREATE INDEX IF NOT EXISTS idx_relation_from_column_id ON relation(from_column_id)",
    "CREATE INDEX IF NOT EXISTS idx_relation_to_column_id ON relation(to_column_id)",
    "CREATE INDEX IF NOT EXISTS idx_schema_change_project_id ON schema_change(project_id, id DESC)",
];

pub const GET_PROJECT: &str = r#"
    SELECT id, display_name, connection_string, created_at, updated_at
    FROM project
    WHERE id = $1
"#;

pub const LIST_MODELS_BY_PROJECT: &str = r#"
    SELECT id, project_id, source_table_name, reference_name, display_name
    FROM model
    WHERE project_id = $1
    ORDER BY id
"#;

pub const LIST_COLUMNS_BY_MODEL_IDS: &str = r#"
    SELECT id, model_id, source_column_name, reference_name, display_name, type, is_calculated, lineage
    FROM model_column
    WHERE model_id = ANY($1)
    ORDER BY model_id, id
"#;

pub const LIST_COLUMNS_BY_NAMES: &str = r#"
    SELECT id, model_id, source_column_name, reference_name, display_name, type, is_calculated, lineage
    FROM model_column
    WHERE model_id = $1
        AND source_column_name = ANY($2)
    ORDER BY id
"#;

pub const LIST_CALCULATED_FIELDS_BY_PROJECT: &str = r#"
    SELECT c.id, c.model_id, c.source_column_name, c.reference_name, c.display_name,
           c.type, c.is_calculated, c.lineage
    FROM model_column c
    JOIN model m ON m.id = c.model_id
    WHERE m.project_id = $1
        AND c.is_calculated = true
    ORDER BY c.id
"#;

pub const FIND_RELATIONS_BY_COLUMN_IDS: &str = r#"
    SELECT id, project_id, name, from_column_id, to_column_id, join_type
    FROM relation
    WHERE from_column_id = ANY($1)
        OR to_column_id = ANY($1)
    ORDER BY id
"#;

pub const DELETE_COLUMNS_BY_IDS: &str = "DELETE FROM model_column WHERE id = ANY($1)";

pub const DELETE_RELATIONS_BY_IDS: &str = "DELETE FROM relation WHERE id = ANY($1)";

pub const DELETE_MODEL_BY_ID: &str = "DELETE FROM model WHERE id = $1";

pub const FIND_LAST_SCHEMA_CHANGE: &str = r#"
    SELECT id, project_id, change, resolve, checksum, created_at, updated_at
    FROM schema_change
    WHERE project_id = $1
    ORDER BY id DESC
    LIMIT 1
"#;

pub const INSERT_SCHEMA_CHANGE: &str = r#"
    INSERT INTO schema_change (project_id, change, resolve, checksum, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $5)
    RETURNING id, project_id, change, resolve, checksum, created_at, updated_at
"#;

pub const UPDATE_SCHEMA_CHANGE_RESOLVE: &str = r#"
    UPDATE schema_change
    SET resolve = $2, updated_at = $3
    WHERE id = $1
    RETURNING id, project_id, change, resolve, checksum, created_at, updated_at
"#;

/// Live columns of the given schemas, in ordinal order
pub const LIVE_COLUMNS: &str = r#"
    SELECT
        c.table_schema::text AS table_schema,
        c.table_name::text AS table_name,
        c.column_name::text AS column_name,
        c.data_type::text AS data_type
    FROM information_schema.columns c
    JOIN information_schema.tables t
        ON t.table_schema = c.table_schema
        AND t.table_name = c.table_name
    WHERE c.table_schema = ANY($1)
        AND t.table_type IN ('BASE TABLE', 'VIEW')
    ORDER BY c.table_schema, c.table_name, c.ordinal_position
"#;

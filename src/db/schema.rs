/// SQL-schema för Biglittle
/// Tabellnamnen följer den webbaserade föregångarens tabeller

pub const SCHEMA_VERSION: i32 = 3;

pub const CREATE_TABLES: &str = r#"
-- Organisation (en per databas i praktiken)
CREATE TABLE IF NOT EXISTS organization (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Formulär
CREATE TABLE IF NOT EXISTS form (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    deadline TEXT,
    code TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (organization_id) REFERENCES organization(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_form_organization ON form(organization_id);

-- Frågor
CREATE TABLE IF NOT EXISTS question (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    form_id INTEGER NOT NULL,
    prompt TEXT NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('FREE_RESPONSE', 'MULTIPLE_CHOICE', 'SELECT_ALL', 'SECTION_HEADER')),
    "index" INTEGER NOT NULL DEFAULT 0,
    description TEXT,
    FOREIGN KEY (form_id) REFERENCES form(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_question_form ON question(form_id);

-- Svarsalternativ (endast flervalsfrågor)
CREATE TABLE IF NOT EXISTS question_option (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    question_id INTEGER NOT NULL,
    label TEXT NOT NULL,
    "index" INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (question_id) REFERENCES question(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_option_question ON question_option(question_id);

-- Inskickade enkäter
CREATE TABLE IF NOT EXISTS form_submission (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    form_id INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (form_id) REFERENCES form(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_submission_form ON form_submission(form_id);

-- Svar per fråga
CREATE TABLE IF NOT EXISTS question_response (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    form_submission_id INTEGER NOT NULL,
    question_id INTEGER NOT NULL,
    text TEXT,
    FOREIGN KEY (form_submission_id) REFERENCES form_submission(id) ON DELETE CASCADE,
    FOREIGN KEY (question_id) REFERENCES question(id) ON DELETE CASCADE,
    UNIQUE (form_submission_id, question_id)
);

CREATE INDEX IF NOT EXISTS idx_response_submission ON question_response(form_submission_id);

-- Valda alternativ per svar
CREATE TABLE IF NOT EXISTS response_option_selection (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    question_response_id INTEGER NOT NULL,
    question_option_id INTEGER NOT NULL,
    FOREIGN KEY (question_response_id) REFERENCES question_response(id) ON DELETE CASCADE,
    FOREIGN KEY (question_option_id) REFERENCES question_option(id) ON DELETE CASCADE,
    UNIQUE (question_response_id, question_option_id)
);

-- Fadderträd (högst ett per formulär)
CREATE TABLE IF NOT EXISTS family_tree (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    form_id INTEGER NOT NULL UNIQUE,
    question_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    code TEXT NOT NULL,
    author_id TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (form_id) REFERENCES form(id) ON DELETE CASCADE,
    FOREIGN KEY (question_id) REFERENCES question(id) ON DELETE CASCADE
);

-- Trädmedlemmar (noder)
CREATE TABLE IF NOT EXISTS tree_member (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    family_tree_id INTEGER NOT NULL,
    identifier TEXT NOT NULL,
    position_x REAL NOT NULL DEFAULT 0,
    position_y REAL NOT NULL DEFAULT 0,
    is_big INTEGER NOT NULL DEFAULT 0,
    form_submission_id INTEGER,
    FOREIGN KEY (family_tree_id) REFERENCES family_tree(id) ON DELETE CASCADE,
    FOREIGN KEY (form_submission_id) REFERENCES form_submission(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_member_tree ON tree_member(family_tree_id);

-- Kopplingar big -> little (kanter)
CREATE TABLE IF NOT EXISTS connections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    family_tree_id INTEGER NOT NULL,
    big_id INTEGER NOT NULL,
    little_id INTEGER NOT NULL,
    points INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (family_tree_id) REFERENCES family_tree(id) ON DELETE CASCADE,
    FOREIGN KEY (big_id) REFERENCES tree_member(id) ON DELETE CASCADE,
    FOREIGN KEY (little_id) REFERENCES tree_member(id) ON DELETE CASCADE,
    CHECK (big_id <> little_id),
    UNIQUE (big_id, little_id)
);

CREATE INDEX IF NOT EXISTS idx_connections_tree ON connections(family_tree_id);
-- En little har högst en big
CREATE UNIQUE INDEX IF NOT EXISTS idx_connections_little ON connections(little_id);

-- Utmaningar
CREATE TABLE IF NOT EXISTS challenges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    family_tree_id INTEGER NOT NULL,
    prompt TEXT NOT NULL,
    point_value INTEGER,
    deadline TEXT,
    FOREIGN KEY (family_tree_id) REFERENCES family_tree(id) ON DELETE CASCADE
);

-- Poängtilldelningar (liggare)
CREATE TABLE IF NOT EXISTS point_submission (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    connection_id INTEGER NOT NULL,
    challenge_id INTEGER,
    prompt TEXT NOT NULL,
    point INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (connection_id) REFERENCES connections(id) ON DELETE CASCADE,
    FOREIGN KEY (challenge_id) REFERENCES challenges(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_point_connection ON point_submission(connection_id);
CREATE INDEX IF NOT EXISTS idx_point_challenge ON point_submission(challenge_id);

-- Migrationshistorik
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

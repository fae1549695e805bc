//! Diesel schema for audit task persistence.

diesel::table! {
    /// Audit task records.
    audit_tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Owning project.
        project_id -> Uuid,
        /// Task kind.
        #[max_length = 20]
        kind -> Varchar,
        /// Lifecycle status.
        #[max_length = 20]
        status -> Varchar,
        /// Files discovered before the cap.
        total_files -> Int8,
        /// Files processed.
        scanned_files -> Int8,
        /// Lines across analyzed files.
        total_lines -> Int8,
        /// Persisted issue count.
        issues_count -> Int8,
        /// Aggregate quality score.
        quality_score -> Float8,
        /// Exclusion patterns and depth.
        scan_config -> Jsonb,
        /// Failure condition.
        error_message -> Nullable<Text>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Time the task entered `running`.
        started_at -> Nullable<Timestamptz>,
        /// Time the task became terminal.
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Issues found by audit tasks.
    audit_issues (id) {
        /// Issue identifier.
        id -> Uuid,
        /// Insertion order.
        seq -> Int8,
        /// Owning task.
        task_id -> Uuid,
        /// Root-relative file path.
        file_path -> Text,
        /// 1-based line.
        line -> Nullable<Int4>,
        /// 1-based column.
        column_number -> Nullable<Int4>,
        /// Analyzer category.
        #[max_length = 100]
        issue_type -> Varchar,
        /// Severity.
        #[max_length = 20]
        severity -> Varchar,
        /// Summary.
        title -> Text,
        /// Description.
        description -> Text,
        /// Suggested remediation.
        suggestion -> Nullable<Text>,
        /// Offending code excerpt.
        code_snippet -> Nullable<Text>,
        /// Structured explanation.
        ai_explanation -> Nullable<Jsonb>,
        /// Review status.
        #[max_length = 20]
        status -> Varchar,
    }
}

diesel::joinable!(audit_issues -> audit_tasks (task_id));
diesel::allow_tables_to_appear_in_same_query!(audit_tasks, audit_issues);

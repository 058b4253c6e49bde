//! Diesel schema for ticket reconciliation persistence.

diesel::table! {
    /// Tickets mirrored from the defect tracker, keyed by tracker ID.
    tickets (id) {
        /// Tracker identifier.
        id -> BigInt,
        /// Ticket key.
        #[max_length = 64]
        key -> Varchar,
        /// Workflow status name.
        status -> Text,
        /// Ticket summary.
        summary -> Text,
        /// Last modification time reported by the tracker.
        last_change_time -> Timestamptz,
        /// Versions the defect affects.
        affects_versions -> Array<Text>,
        /// Versions containing the fix.
        fix_versions -> Array<Text>,
        /// Versions the fix is targeted at.
        target_versions -> Array<Text>,
        /// Tracker components.
        components -> Array<Text>,
        /// Tracker labels.
        labels -> Array<Text>,
        /// Canonical ticket URL.
        url -> Text,
    }
}

diesel::table! {
    /// Ticket to test associations.
    ticket_tests (ticket_id, test_id) {
        /// Ticket identifier.
        ticket_id -> BigInt,
        /// Test identifier.
        test_id -> BigInt,
    }
}

diesel::table! {
    /// Ticket to CI job associations.
    ticket_jobs (ticket_id, job_id) {
        /// Ticket identifier.
        ticket_id -> BigInt,
        /// Job identifier.
        job_id -> BigInt,
    }
}

diesel::table! {
    /// Known tests.
    tests (id) {
        /// Test identifier.
        id -> BigInt,
        /// Test name.
        name -> Text,
    }
}

diesel::table! {
    /// Known CI job definitions.
    jobs (id) {
        /// Job identifier.
        id -> BigInt,
        /// Job name.
        name -> Text,
    }
}

diesel::table! {
    /// Curated regression triage records.
    triages (id) {
        /// Triage identifier.
        id -> BigInt,
        /// Triage description.
        description -> Text,
        /// Curated ticket URL.
        url -> Text,
        /// Linked ticket, cleared when the ticket is deleted.
        ticket_id -> Nullable<BigInt>,
    }
}

diesel::joinable!(ticket_tests -> tickets (ticket_id));
diesel::joinable!(ticket_tests -> tests (test_id));
diesel::joinable!(ticket_jobs -> tickets (ticket_id));
diesel::joinable!(ticket_jobs -> jobs (job_id));
diesel::joinable!(triages -> tickets (ticket_id));

diesel::allow_tables_to_appear_in_same_query!(tickets, ticket_tests, ticket_jobs, tests, jobs, triages);

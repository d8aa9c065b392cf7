
mod corpus_resume;
mod corpus_store;
mod decompose_traceability;
mod pipeline_run;
mod review_dispositions;
mod selector_scenarios;

pub mod threaded_cluster_executor;

mod transaction_lifecycle_test;

mod dead_letter_queue_test;

mod notification_tests;

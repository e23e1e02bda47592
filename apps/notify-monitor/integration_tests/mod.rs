mod monitor_run;
